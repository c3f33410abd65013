use redb::TableDefinition;

/// Users table: user_id (UUID) -> UserRecord (serialized)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Email index: normalized email -> user_id
pub const USERS_BY_EMAIL: TableDefinition<&str, &str> = TableDefinition::new("users_by_email");

/// Sessions table: bearer token -> SessionRecord (serialized)
pub const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Usage counters: (user_id, period key) -> UsageRecord (serialized)
/// At most one row per user and period; old periods are kept for history
pub const USAGE: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("usage");

/// Analyses table: analysis id -> AnalysisRecord (serialized), append-only
pub const ANALYSES: TableDefinition<&str, &[u8]> = TableDefinition::new("analyses");

/// User analyses index: user_id -> Vec<analysis id> in insertion order
pub const USER_ANALYSES: TableDefinition<&str, &[u8]> = TableDefinition::new("user_analyses");

/// Billing index: Stripe customer id -> user_id
pub const STRIPE_CUSTOMERS: TableDefinition<&str, &str> = TableDefinition::new("stripe_customers");
