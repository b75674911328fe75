pub mod abi;
pub mod amount;
pub mod board;
pub mod chain;
pub mod client;
pub mod config;
pub mod contract;
pub mod game;
pub mod local;
pub mod rpc;
pub mod session;
pub mod ui;
pub mod wallets;
