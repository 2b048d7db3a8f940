//! Assembly of the parameter set handed to the test executable.
//!
//! The set always holds five groups in a fixed order. Four of them are keyed:
//! their content is published under a single top-level parameter name. The
//! test parameters are inlined, so each top-level key of that document becomes
//! a parameter of its own.

use log::warn;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::Loaded;

/// Parameter carrying the robot URDF.
pub const ROBOT_DESCRIPTION: &str = "robot_description";
/// Parameter carrying the robot SRDF.
pub const ROBOT_DESCRIPTION_SEMANTIC: &str = "robot_description_semantic";
/// Parameter carrying the kinematics solver configuration.
pub const ROBOT_DESCRIPTION_KINEMATICS: &str = "robot_description_kinematics";
/// Parameter carrying the joint limits.
pub const ROBOT_DESCRIPTION_PLANNING: &str = "robot_description_planning";

const ROS_PARAMETERS: &str = "ros__parameters";

/// How a group contributes to the final parameter namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLayout {
    /// The value is published under one parameter name.
    Keyed(&'static str),
    /// The value is a mapping whose keys are published directly.
    Inline,
}

/// One group of parameters, possibly without a value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGroup {
    layout: GroupLayout,
    value: Option<Value>,
}

impl ParameterGroup {
    /// Group published under `name`.
    #[must_use]
    pub const fn keyed(name: &'static str, value: Option<Value>) -> Self {
        Self {
            layout: GroupLayout::Keyed(name),
            value,
        }
    }

    /// Group whose mapping keys are published directly.
    #[must_use]
    pub const fn inline(value: Option<Value>) -> Self {
        Self {
            layout: GroupLayout::Inline,
            value,
        }
    }

    /// Layout of the group.
    #[must_use]
    pub const fn layout(&self) -> GroupLayout {
        self.layout
    }

    /// Parameter name of a keyed group.
    #[must_use]
    pub const fn key(&self) -> Option<&'static str> {
        match self.layout {
            GroupLayout::Keyed(name) => Some(name),
            GroupLayout::Inline => None,
        }
    }

    /// Value of the group; `None` when its fragment could not be loaded.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// The five configuration fragments consumed by the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragments {
    /// URDF text.
    pub robot_description: Loaded<String>,
    /// SRDF text.
    pub robot_description_semantic: Loaded<String>,
    /// Kinematics solver configuration.
    pub kinematics: Loaded<Value>,
    /// Joint limit configuration.
    pub joint_limits: Loaded<Value>,
    /// Parameters specific to the test executable.
    pub test_parameters: Loaded<Value>,
}

/// Errors raised while rendering a [`ParameterSet`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParameterError {
    /// Two groups publish the same parameter name.
    #[error("parameter {key:?} is defined by more than one group")]
    DuplicateKey {
        /// The conflicting parameter name.
        key: String,
    },
    /// An inlined document is not a mapping.
    #[error("inline parameter group must be a mapping")]
    InlineNotMapping,
    /// The document could not be serialised.
    #[error("failed to serialise parameters: {0}")]
    Serialise(#[source] serde_yaml::Error),
}

/// Ordered, immutable parameter set passed to the child process.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    groups: Vec<ParameterGroup>,
}

impl ParameterSet {
    /// Assemble the fixed five-group set from loaded fragments.
    ///
    /// Absent fragments still occupy their slot. The fragments' contents are
    /// not inspected here.
    #[must_use]
    pub fn assemble(fragments: Fragments) -> Self {
        let Fragments {
            robot_description,
            robot_description_semantic,
            kinematics,
            joint_limits,
            test_parameters,
        } = fragments;
        Self::from_groups(vec![
            ParameterGroup::keyed(
                ROBOT_DESCRIPTION,
                robot_description.map(Value::String).into_option(),
            ),
            ParameterGroup::keyed(
                ROBOT_DESCRIPTION_SEMANTIC,
                robot_description_semantic.map(Value::String).into_option(),
            ),
            ParameterGroup::keyed(ROBOT_DESCRIPTION_KINEMATICS, kinematics.into_option()),
            ParameterGroup::keyed(ROBOT_DESCRIPTION_PLANNING, joint_limits.into_option()),
            ParameterGroup::inline(test_parameters.into_option()),
        ])
    }

    /// Build a set from arbitrary groups, kept in the given order.
    #[must_use]
    pub const fn from_groups(groups: Vec<ParameterGroup>) -> Self {
        Self { groups }
    }

    /// Groups in launch order.
    #[must_use]
    pub fn groups(&self) -> &[ParameterGroup] {
        &self.groups
    }

    /// Flatten the groups into one parameter mapping.
    ///
    /// A keyed group without a value publishes its name with a null value; an
    /// inline group without a value publishes nothing.
    pub fn flatten(&self) -> Result<Mapping, ParameterError> {
        let mut parameters = Mapping::new();
        for group in &self.groups {
            match (group.layout, &group.value) {
                (GroupLayout::Keyed(name), value) => {
                    insert_unique(
                        &mut parameters,
                        Value::String(name.to_owned()),
                        value.clone().unwrap_or(Value::Null),
                    )?;
                }
                (GroupLayout::Inline, Some(Value::Mapping(entries))) => {
                    for (key, value) in entries {
                        insert_unique(&mut parameters, key.clone(), value.clone())?;
                    }
                }
                (GroupLayout::Inline, Some(Value::Null)) => {}
                (GroupLayout::Inline, Some(_)) => return Err(ParameterError::InlineNotMapping),
                (GroupLayout::Inline, None) => {
                    warn!("inline parameter group is absent and contributes no parameters");
                }
            }
        }
        Ok(parameters)
    }

    /// Build the parameter file document addressed to `node_name`.
    pub fn to_params_document(&self, node_name: &str) -> Result<Value, ParameterError> {
        let mut node = Mapping::new();
        node.insert(
            Value::String(ROS_PARAMETERS.to_owned()),
            Value::Mapping(self.flatten()?),
        );
        let mut document = Mapping::new();
        document.insert(Value::String(node_name.to_owned()), Value::Mapping(node));
        Ok(Value::Mapping(document))
    }

    /// Render the parameter file for `node_name` as YAML text.
    pub fn render(&self, node_name: &str) -> Result<String, ParameterError> {
        let document = self.to_params_document(node_name)?;
        serde_yaml::to_string(&document).map_err(ParameterError::Serialise)
    }
}

fn insert_unique(parameters: &mut Mapping, key: Value, value: Value) -> Result<(), ParameterError> {
    if parameters.contains_key(&key) {
        return Err(ParameterError::DuplicateKey {
            key: describe_key(&key),
        });
    }
    parameters.insert(key, value);
    Ok(())
}

fn describe_key(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_owned())
            .unwrap_or_else(|_| format!("{other:?}")),
    }
}
