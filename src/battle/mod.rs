pub mod ai;
pub mod buffs;
pub mod conditions;
pub mod controller;
pub mod damage;
pub mod resolver;
pub mod state;
pub mod stats;
pub mod turn_order;

#[cfg(test)]
mod tests;
