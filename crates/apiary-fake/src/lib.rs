pub mod chainsim;
pub mod generator;
pub mod wordlist;

pub use chainsim::ChainSim;
pub use generator::WalletForge;
