mod host;

pub use host::MemoryMediaHost;
