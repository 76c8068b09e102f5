//! Client library for the Ensembl BioMart service.
//!
//! A [`session::MartSession`] holds the currently selected mart and dataset
//! and exposes the discovery operations (marts, datasets, attributes,
//! filters, configs) and the query operation. Queries are built as the
//! BioMart micro-XML dialect embedded in a GET URL, fetched through a
//! [`transport::MartTransport`], and parsed into [`table::Table`] values.
//! [`genes::DefaultQueryRunner`] layers the default gene query (positional
//! attributes, type coercion, strand-aware sort) on top of a session.

pub mod annotate;
pub mod error;
pub mod genes;
pub mod query;
pub mod response;
pub mod session;
pub mod table;
pub mod transport;
