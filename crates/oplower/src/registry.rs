use std::collections::HashMap;

use crate::builder::{
    BuilderType, OpBuilder, create_activation_op_builder, create_binary_op_builder,
    create_clip_op_builder, create_conv_op_builder,
};

/// Operator types lowered by the default registrations.
pub const ACTIVATION_OP_TYPES: &[&str] = &["Relu", "Sigmoid", "Tanh", "LeakyRelu", "Elu"];

/// Element-wise binary operator types lowered by the default registrations.
pub const BINARY_OP_TYPES: &[&str] = &["Add", "Sub", "Mul", "Div"];

/// Maps operator type names to builders.
///
/// Builders are owned by the registry. Operator types registered under the same
/// [`BuilderType`] share one instance, and registering an operator type twice keeps the first
/// registration.
#[derive(Debug)]
pub struct OpBuilderRegistrations {
    builders: Vec<Box<dyn OpBuilder>>,
    op_builder_map: HashMap<String, usize>,
    builder_type_map: HashMap<BuilderType, usize>,
}

impl Default for OpBuilderRegistrations {
    fn default() -> Self {
        Self::new()
    }
}

impl OpBuilderRegistrations {
    /// Registrations holding every builder of the crate.
    pub fn new() -> Self {
        let mut registrations = Self::empty();

        create_clip_op_builder("Clip", &mut registrations);
        create_conv_op_builder("Conv", &mut registrations);
        for op_type in ACTIVATION_OP_TYPES {
            create_activation_op_builder(op_type, &mut registrations);
        }
        for op_type in BINARY_OP_TYPES {
            create_binary_op_builder(op_type, &mut registrations);
        }

        registrations
    }

    /// Registrations without any builder.
    pub fn empty() -> Self {
        Self {
            builders: Vec::new(),
            op_builder_map: HashMap::new(),
            builder_type_map: HashMap::new(),
        }
    }

    /// Get the builder registered for `op_type`.
    pub fn get_op_builder(&self, op_type: &str) -> Option<&dyn OpBuilder> {
        self.slot(op_type).map(|index| self.builders[index].as_ref())
    }

    /// Index of the builder instance registered for `op_type`.
    fn slot(&self, op_type: &str) -> Option<usize> {
        self.op_builder_map.get(op_type).copied()
    }

    /// Register the builder tagged `builder_type` for `op_type`.
    ///
    /// `factory` is only called when no builder with that tag exists yet. The new instance is
    /// indexed under its own [`OpBuilder::builder_type`], which should equal `builder_type`.
    pub fn add_op_builder<F>(&mut self, op_type: &str, builder_type: BuilderType, factory: F)
    where
        F: FnOnce() -> Box<dyn OpBuilder>,
    {
        if self.op_builder_map.contains_key(op_type) {
            log::debug!("Operator type {op_type} is already registered");
            return;
        }

        let index = match self.builder_type_map.get(&builder_type) {
            Some(&index) => index,
            None => self.insert_builder(factory()),
        };

        log::debug!("Registered {op_type} with the {builder_type} builder");
        self.op_builder_map.insert(op_type.to_string(), index);
    }

    fn insert_builder(&mut self, builder: Box<dyn OpBuilder>) -> usize {
        let builder_type = builder.builder_type();
        if let Some(&index) = self.builder_type_map.get(&builder_type) {
            return index;
        }

        self.builders.push(builder);
        let index = self.builders.len() - 1;
        self.builder_type_map.insert(builder_type, index);
        index
    }

    /// Whether a builder is registered for `op_type`.
    pub fn contains(&self, op_type: &str) -> bool {
        self.op_builder_map.contains_key(op_type)
    }

    /// Registered operator types, sorted.
    pub fn op_types(&self) -> Vec<&str> {
        let mut op_types: Vec<_> = self.op_builder_map.keys().map(String::as_str).collect();
        op_types.sort_unstable();
        op_types
    }

    /// Number of distinct builder instances.
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Whether no builder is registered.
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}
