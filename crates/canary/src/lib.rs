//! Data Canary command line
//!
//! Thin layer over `canary_contract`: reads snapshot, suggestion and
//! override JSON files, drives the engine and the contract registry, and
//! renders results as tables or JSON.

pub mod cli;
