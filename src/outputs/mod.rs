//! Persisted outputs.
//!
//! - [`dataset`]: CSV datasets (scripted, AI-assisted, merged)
//!
//! Raw page dumps are written by [`crate::fetch`] as pages are retrieved.
//!
//! ```text
//! data/
//! ├── data_news_articles.csv      # scripted collector
//! ├── all_articles.csv            # AI-assisted collector
//! └── combined_news_articles.csv  # merge stage, read by the viewer
//! raw_content/
//! └── www.kdnuggets.com_tag_data-engineering.txt
//! ```

pub mod dataset;
