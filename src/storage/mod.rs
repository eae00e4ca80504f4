mod charts;
mod users;

pub use charts::{BirthRecord, ChartStore, NewChart, StorageError, StoredChart};
pub use users::{BirthPlace, BirthProfile, ProfileChanges, StoredUser, UserError, UserStore};
