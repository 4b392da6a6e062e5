//! Chain context consumed by the authorization core

/// Source of the current finalized block height
pub trait ChainContext {
    fn current_height(&self) -> u64;
}

/// A fixed height, for hosts that already know where the chain is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeight(pub u64);

impl ChainContext for BlockHeight {
    fn current_height(&self) -> u64 {
        self.0
    }
}

impl<T: ChainContext + ?Sized> ChainContext for &T {
    fn current_height(&self) -> u64 {
        (**self).current_height()
    }
}
