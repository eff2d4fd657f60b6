pub mod bag;
pub mod record;

pub use bag::{BagContents, BagList, BagRecord, NewBag};
pub use record::Record;
