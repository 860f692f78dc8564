//! ttable - A persistent phrase count table over a sorted key-value store.
//!
//! ttable counts how often source phrases, target phrases and source/target
//! pairs occur in a training corpus, as used by statistical phrase-based
//! translation. Phrases are sequences of integer word indices; counts live in
//! any store implementing [`common::Storage`], such as SlateDB.
//!
//! # Architecture
//!
//! Word indices are encoded into fixed-width, order-preserving byte blocks
//! that never contain `0x00` or `0xFF`. Those two byte values form the
//! reserved `SEP` and `HI` marker blocks, which lay the three aggregates out
//! in disjoint regions of one key space:
//!
//! ```text
//! source  SEP | enc(S)
//! target  enc(T)
//! joint   enc(T) | SEP | enc(S)
//! ```
//!
//! All joint entries of a target are therefore adjacent, and counting the
//! source phrases seen with a target is a single range scan.
//!
//! # Key Concepts
//!
//! - **PhraseTable**: The main entry point providing both read and write operations.
//! - **PhraseTableReader**: A read-only view of the table, typically a snapshot.
//! - **PhraseTableRead**: Trait defining read operations shared by both types.
//! - **Vocabulary** and **CorpusReader**: Turn text corpora into [`CorpusRecord`]s.
//!
//! # Example
//!
//! ```ignore
//! use ttable::{Config, CorpusReader, PhraseTable, PhraseTableRead, Vocabulary};
//!
//! let table = PhraseTable::open(Config::default()).await?;
//! let mut vocab = Vocabulary::new(table.codec());
//!
//! for line in CorpusReader::open("corpus.txt")? {
//!     let record = vocab.intern_line(&line?)?;
//!     table.add_record(&record).await?;
//! }
//!
//! let target = vocab.intern_phrase(&["the", "house"])?;
//! println!("{} sources", table.count_sources_for_target(&target).await?);
//! table.close().await?;
//! ```

mod codec;
mod config;
mod corpus;
mod error;
mod key;
mod merge_operator;
mod model;
mod query;
mod reader;
mod serde;
mod storage;
mod table;
mod vocab;

pub use codec::{DEFAULT_INDEX_WIDTH, DIGIT_BASE, IndexCodec, MAX_INDEX_WIDTH, Marker};
pub use config::{Config, WriteOptions};
pub use corpus::{CorpusLine, CorpusReader, FIELD_SEPARATOR};
pub use error::{Error, Result};
pub use key::{PhraseKey, RecordKeys};
pub use merge_operator::CountMergeOperator;
pub use model::{CorpusRecord, Count, EncodedKey, Phrase, WordIndex};
pub use reader::{PhraseTableRead, PhraseTableReader};
pub use table::PhraseTable;
pub use vocab::{RESERVED_SYMBOLS, Vocabulary};
