//! Client code for offcache.
//!
//! This crate provides the request/response model the worker operates on
//! and the HTTP fetch pipeline used as its network.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Network, Request, Response, UrlError, canonicalize, resolve};
pub use reqwest::{Method, StatusCode, Url, header};
