mod rbt;

pub use rbt::InOrder;
pub use rbt::InsertionPoint;
pub use rbt::NodeId;
pub use rbt::RBIndex;
pub use rbt::Side;
