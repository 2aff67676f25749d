pub mod delivery_attempt;
pub mod lead;
