//! The kinematics plugin test launch: which files feed which process.

use camino::Utf8PathBuf;

use crate::{
    Fragments, LaunchDescription, LaunchFixtures, LaunchTest, LaunchTestError, ParameterSet,
    ProcessSpec, ResolveError, ResourceRef, ShareResolver, load_file, load_yaml,
    locate_executable,
};

/// Package shipping the plugin test executable and its test parameters.
pub const KINEMATICS_PACKAGE: &str = "moveit_kinematics";
/// Name of the plugin test executable.
pub const TEST_EXECUTABLE: &str = "test_kinematics_plugin";

const FANUC_DESCRIPTION: &str = "moveit_resources_fanuc_description";
const FANUC_CONFIG: &str = "moveit_resources_fanuc_moveit_config";

/// Inputs and naming of one kinematics plugin test launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KinematicsTestScenario {
    node_name: String,
    robot_description: ResourceRef,
    robot_description_semantic: ResourceRef,
    kinematics: ResourceRef,
    joint_limits: ResourceRef,
    test_parameters: ResourceRef,
}

impl KinematicsTestScenario {
    /// The FANUC arm driven through the LMA kinematics plugin.
    #[must_use]
    pub fn fanuc_lma() -> Self {
        Self {
            node_name: "fanuc_lma".to_owned(),
            robot_description: ResourceRef::new(FANUC_DESCRIPTION, "urdf/fanuc.urdf"),
            robot_description_semantic: ResourceRef::new(FANUC_CONFIG, "config/fanuc.srdf"),
            kinematics: ResourceRef::new(FANUC_CONFIG, "config/kinematics.yaml"),
            joint_limits: ResourceRef::new(FANUC_CONFIG, "config/joint_limits.yaml"),
            test_parameters: ResourceRef::new(KINEMATICS_PACKAGE, "config/fanuc-lma-test.yaml"),
        }
    }

    /// Rename the launched process.
    #[must_use]
    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }

    /// Read test parameters from another file of the kinematics package.
    #[must_use]
    pub fn with_test_parameters(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.test_parameters = ResourceRef::new(KINEMATICS_PACKAGE, path);
        self
    }

    /// Name of the launched process.
    #[must_use]
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// The five input files, in parameter order.
    #[must_use]
    pub const fn resources(&self) -> [&ResourceRef; 5] {
        [
            &self.robot_description,
            &self.robot_description_semantic,
            &self.kinematics,
            &self.joint_limits,
            &self.test_parameters,
        ]
    }

    /// Load every fragment; unreadable ones are absent.
    #[must_use]
    pub fn load_fragments(&self, resolver: &dyn ShareResolver) -> Fragments {
        Fragments {
            robot_description: load_file(resolver, &self.robot_description),
            robot_description_semantic: load_file(resolver, &self.robot_description_semantic),
            kinematics: load_yaml(resolver, &self.kinematics),
            joint_limits: load_yaml(resolver, &self.joint_limits),
            test_parameters: load_yaml(resolver, &self.test_parameters),
        }
    }

    /// Locate the installed plugin test executable.
    pub fn locate_executable(
        &self,
        resolver: &dyn ShareResolver,
    ) -> Result<Utf8PathBuf, ResolveError> {
        locate_executable(resolver, KINEMATICS_PACKAGE, TEST_EXECUTABLE)
    }

    /// Describe the launch: the test process, then keep-alive, then readiness.
    ///
    /// The process is exposed as a fixture under its own name.
    #[must_use]
    pub fn describe(
        &self,
        executable: Utf8PathBuf,
        parameters: ParameterSet,
    ) -> (LaunchDescription, LaunchFixtures) {
        let process = ProcessSpec::new(self.node_name.clone(), executable, parameters);
        let description = LaunchDescription::builder()
            .process(process)
            .keep_alive()
            .ready_to_test()
            .build();
        let fixtures =
            LaunchFixtures::default().with_process(self.node_name.clone(), self.node_name.clone());
        (description, fixtures)
    }

    /// Load, assemble and describe the launch as a ready-to-run test.
    pub fn prepare(
        &self,
        resolver: &dyn ShareResolver,
        executable: Utf8PathBuf,
    ) -> Result<LaunchTest, LaunchTestError> {
        let parameters = ParameterSet::assemble(self.load_fragments(resolver));
        let (description, fixtures) = self.describe(executable, parameters);
        LaunchTest::new(description, fixtures)
    }
}

impl Default for KinematicsTestScenario {
    fn default() -> Self {
        Self::fanuc_lma()
    }
}
