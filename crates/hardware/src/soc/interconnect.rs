//! Hierarchy interconnect.
//!
//! Components never hold references to each other; they name their neighbours
//! with a [`NodeId`]. While a component operates it receives a [`Fabric`]: a
//! split borrow of the component arena that exposes every node except the one
//! currently operating. This gives each level mutable access to its neighbours
//! for the duration of a call without shared ownership or interior mutability.

use std::fmt;

use crate::common::{Packet, SimError};
use crate::soc::traits::Component;

/// Index of a component in the hierarchy arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Mutable view of every component except the one currently operating.
pub struct Fabric<'a> {
    before: &'a mut [Box<dyn Component>],
    after: &'a mut [Box<dyn Component>],
    current: NodeId,
}

impl fmt::Debug for Fabric<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fabric")
            .field("current", &self.current)
            .field("nodes", &(self.before.len() + self.after.len() + 1))
            .finish()
    }
}

impl<'a> Fabric<'a> {
    /// Splits `nodes` around `id`.
    ///
    /// # Arguments
    ///
    /// * `nodes` - The component arena.
    /// * `id` - The component that is about to operate.
    ///
    /// # Returns
    ///
    /// The operating component and a fabric over all the others.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownNode`] when `id` is outside the arena.
    pub fn split(
        nodes: &'a mut [Box<dyn Component>],
        id: NodeId,
    ) -> Result<(&'a mut dyn Component, Self), SimError> {
        if id.0 >= nodes.len() {
            return Err(SimError::UnknownNode(id));
        }
        let (before, rest) = nodes.split_at_mut(id.0);
        let (current, after) = rest.split_first_mut().ok_or(SimError::UnknownNode(id))?;
        let current: &'a mut dyn Component = current.as_mut();
        Ok((current, Self { before, after, current: id }))
    }

    /// The component this fabric was split around.
    pub const fn current(&self) -> NodeId {
        self.current
    }

    /// Mutable access to component `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SelfAccess`] for the operating component and
    /// [`SimError::UnknownNode`] for an id outside the arena.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut dyn Component, SimError> {
        let cur = self.current.0;
        if id.0 == cur {
            return Err(SimError::SelfAccess(id));
        }
        let slot = if id.0 < cur {
            self.before.get_mut(id.0)
        } else {
            self.after.get_mut(id.0 - cur - 1)
        };
        match slot {
            Some(node) => {
                let node: &mut dyn Component = node.as_mut();
                Ok(node)
            }
            None => Err(SimError::UnknownNode(id)),
        }
    }

    /// Delivers `packet` to every component in its `to_return` list, in order.
    ///
    /// # Errors
    ///
    /// Propagates the first failing `return_data`.
    pub fn deliver(&mut self, packet: &Packet) -> Result<(), SimError> {
        for target in &packet.to_return {
            self.node_mut(target.node)?.return_data(target.port, packet)?;
        }
        Ok(())
    }
}
