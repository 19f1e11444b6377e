// Element-wise activation operators. Backward recomputes the cheap transfer
// function from the cached operand value, keeping Function forward stateless.
pub mod relu;
pub mod sigmoid;
pub mod tanh;

pub use relu::relu;
pub use sigmoid::sigmoid;
pub use tanh::tanh;
