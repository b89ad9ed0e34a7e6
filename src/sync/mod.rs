//! Live mirrors of backend tables.
//!
//! [`ListStore`] is the pure reducer, [`ChangeEvent`] the decoded feed
//! message and [`LiveList`] drives both against a [`Backend`](crate::db::Backend).

mod event;
mod live;
mod store;

pub use event::{ChangeEvent, ChangeNotice, RESYNC_PAYLOAD};
pub use live::{LiveList, SyncUpdate};
pub use store::{Applied, FetchOutcome, FetchTicket, ListOrder, ListStatus, ListStore, MAX_REPLAY};
