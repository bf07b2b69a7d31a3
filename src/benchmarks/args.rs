use anyhow::Result;

/// Prefix of the VM options that steer the native-image pipeline
pub const NATIVE_IMAGE_ARG_PREFIX: &str = "-Dnative-image.benchmark.";

pub const STAGES: &str = "stages";
pub const EXTRA_AGENT_RUN_ARG: &str = "extra-agent-run-arg";
pub const EXTRA_PROFILE_RUN_ARG: &str = "extra-profile-run-arg";
pub const EXTRA_AGENT_PROFILE_RUN_ARG: &str = "extra-agent-profile-run-arg";
pub const EXTRA_IMAGE_BUILD_ARGUMENT: &str = "extra-image-build-argument";
pub const EXTRA_RUN_ARG: &str = "extra-run-arg";
pub const SKIP_AGENT_ASSERTIONS: &str = "skip-agent-assertions";

/// Arguments of one benchmark invocation: VM args before the first `--`,
/// benchmark run args after it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationArgs {
    vm_args: Vec<String>,
    run_args: Vec<String>,
}

impl InvocationArgs {
    pub fn new(vm_args: Vec<String>, run_args: Vec<String>) -> Self {
        Self { vm_args, run_args }
    }

    /// Split a flat token list at the first `--`
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vm_args = Vec::new();
        let mut run_args = Vec::new();
        let mut in_run_args = false;
        for arg in args {
            let arg = arg.into();
            if !in_run_args && arg == "--" {
                in_run_args = true;
            } else if in_run_args {
                run_args.push(arg);
            } else {
                vm_args.push(arg);
            }
        }
        Self { vm_args, run_args }
    }

    /// VM args with the pipeline control options removed
    pub fn vm_args(&self) -> Vec<String> {
        self.vm_args
            .iter()
            .filter(|arg| !arg.starts_with(NATIVE_IMAGE_ARG_PREFIX))
            .cloned()
            .collect()
    }

    /// `-D` system properties among the VM args, control options excluded
    pub fn system_properties(&self) -> Vec<String> {
        self.vm_args()
            .into_iter()
            .filter(|arg| arg.starts_with("-D"))
            .collect()
    }

    pub fn run_args(&self) -> &[String] {
        &self.run_args
    }

    /// Every value given for `-Dnative-image.benchmark.<key>=`, in order
    pub fn native_image_values(&self, key: &str) -> Vec<String> {
        let prefix = format!("{NATIVE_IMAGE_ARG_PREFIX}{key}=");
        self.vm_args
            .iter()
            .filter_map(|arg| arg.strip_prefix(&prefix))
            .map(str::to_string)
            .collect()
    }

    /// Boolean control option; the last occurrence wins
    pub fn native_image_flag(&self, key: &str) -> Result<Option<bool>> {
        match self.native_image_values(key).last() {
            None => Ok(None),
            Some(value) => match value.as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                other => anyhow::bail!(
                    "Invalid value for {NATIVE_IMAGE_ARG_PREFIX}{key}: {other} (expected true or false)"
                ),
            },
        }
    }
}
