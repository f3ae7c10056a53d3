#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(
	clippy::pedantic,
	clippy::cargo,
	clippy::nursery,
	missing_docs,
	rustdoc::missing_crate_level_docs
)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::tabs_in_doc_comments)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::use_self)] // False-positives in #[derive(Serialize)] generated code

pub mod config;
pub mod descriptor;
pub mod generator;
pub mod resolver;
pub mod util;
pub mod validator;
