mod data_rate;
mod experiment;
mod network;
mod queues;
mod throughput;
