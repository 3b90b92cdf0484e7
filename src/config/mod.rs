mod change_list;

pub use change_list::{ChangeList, ChangeListError};
