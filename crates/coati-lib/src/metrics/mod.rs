pub mod spikes;
