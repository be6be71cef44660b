mod demux;
mod envelope;
mod exchange;
mod framing;
