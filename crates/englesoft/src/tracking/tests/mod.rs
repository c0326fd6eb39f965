mod common;
mod recorder;
