mod ingredients;
mod recipe_lists;
mod recipes;
mod subscriptions;
mod tags;
mod users;

pub use ingredients::*;
pub use recipe_lists::*;
pub use recipes::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;
