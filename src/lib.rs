//! Survey comment annotation: text normalisation, sentiment, topics and
//! named entities over a tabular dataset.

pub mod cli;
pub mod config;
pub mod data;
pub mod evaluation;
pub mod logging;
pub mod nlp;
pub mod pipeline;
