//! Domain entities whose tables the schema sync keeps in place.

pub mod connecteds;
pub mod echos;
pub mod images;
pub mod key_values;
pub mod todos;
pub mod users;

pub use connecteds::Entity as Connecteds;
pub use connecteds::Model as Connected;
pub use echos::Entity as Echos;
pub use echos::Model as Echo;
pub use images::Entity as Images;
pub use images::Model as Image;
pub use key_values::Entity as KeyValues;
pub use key_values::Model as KeyValue;
pub use todos::Entity as Todos;
pub use todos::Model as Todo;
pub use users::Entity as Users;
pub use users::Model as User;
