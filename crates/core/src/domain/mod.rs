pub mod decision;
pub mod intent;
pub mod moderation;
