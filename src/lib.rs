//! ballotcrawl - sample ballot acquisition and parsing.
//!
//! Tracks one page per election and precinct on the elections authority's
//! site, re-fetches pages with a probability that adapts to how often they
//! change, and interprets ballot tables into positions, candidates and
//! proposals.

pub mod cli;
pub mod config;
pub mod models;
pub mod parser;
pub mod repository;
pub mod scrapers;
pub mod services;
