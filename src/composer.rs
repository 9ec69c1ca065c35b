use std::path::{Path, PathBuf};
use std::sync::Arc;

use opentelemetry::KeyValue;
use tracing::debug;

use crate::error::ComposeError;
use crate::installation::Installation;
use crate::opened_packages::opened_packages;
use crate::product_info::{ProductMetadata, host_os};
use crate::telemetry::{Telemetry, current_trace_id, with_span};
use crate::version::Version;
use crate::vm_options::load_filtered;

const DEFAULT_MAX_HEAP: &str = "-Xmx512m";
const DEFAULT_MIN_HEAP: &str = "-Xms256m";
const SYSTEM_PROPERTY_PREFIX: &str = "-D";
const IDE_HOME_PLACEHOLDERS: [&str; 3] = ["$APP_PACKAGE", "$IDE_HOME", "%IDE_HOME%"];

/// First build that ships kotlinx.coroutines debug probes support.
fn coroutines_agent_since() -> Version {
    Version::new(vec![221])
}

/// Caller-supplied heap sizes in JVM size syntax, e.g. `2g`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LaunchPreferences {
    pub(crate) max_heap: Option<String>,
    pub(crate) min_heap: Option<String>,
}

impl LaunchPreferences {
    /// Blank sizes are treated as not given.
    pub(crate) fn new(max_heap: Option<String>, min_heap: Option<String>) -> Self {
        let non_blank = |value: Option<String>| {
            value
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            max_heap: non_blank(max_heap),
            min_heap: non_blank(min_heap),
        }
    }
}

/// Stages of the argument list, in emission order.
///
/// The JVM honors the last occurrence of a repeated flag, so later stages
/// override earlier ones.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Stage {
    DefaultHeap,
    BootClasspath,
    VmOptions,
    DiagnosticsAgent,
    AdditionalArguments,
    HeapOverrides,
}

impl Stage {
    const ORDER: [Stage; 6] = [
        Stage::DefaultHeap,
        Stage::BootClasspath,
        Stage::VmOptions,
        Stage::DiagnosticsAgent,
        Stage::AdditionalArguments,
        Stage::HeapOverrides,
    ];

    fn name(self) -> &'static str {
        match self {
            Stage::DefaultHeap => "default_heap",
            Stage::BootClasspath => "boot_classpath",
            Stage::VmOptions => "vm_options",
            Stage::DiagnosticsAgent => "diagnostics_agent",
            Stage::AdditionalArguments => "additional_arguments",
            Stage::HeapOverrides => "heap_overrides",
        }
    }
}

/// Composes the JVM arguments for launching one installation in a sandbox.
pub(crate) struct ArgumentComposer {
    installation: Installation,
    agent_path: PathBuf,
    preferences: LaunchPreferences,
    telemetry: Option<Arc<Telemetry>>,
}

impl ArgumentComposer {
    pub(crate) fn new(
        installation_dir: impl Into<PathBuf>,
        agent_path: impl Into<PathBuf>,
        preferences: LaunchPreferences,
    ) -> Self {
        Self {
            installation: Installation::new(installation_dir),
            agent_path: agent_path.into(),
            preferences,
            telemetry: None,
        }
    }

    pub(crate) fn with_telemetry(mut self, telemetry: Option<Arc<Telemetry>>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub(crate) fn installation(&self) -> &Installation {
        &self.installation
    }

    /// Ordered, blank-free argument list.
    ///
    /// Fails only when the installation has no readable build number; nothing
    /// is composed in that case.
    pub(crate) fn compose(&self) -> Result<Vec<String>, ComposeError> {
        let build_number = self.installation.build_number()?;
        let attributes = [
            KeyValue::new(
                "platform_jvm_args.installation",
                self.installation.root().display().to_string(),
            ),
            KeyValue::new("platform_jvm_args.build", build_number.to_string()),
        ];
        let arguments = with_span(self.telemetry.as_deref(), "compose", &attributes, || {
            if let Some(trace_id) = current_trace_id() {
                debug!(trace_id = %trace_id, "composition traced");
            }
            let mut arguments = Vec::new();
            for stage in Stage::ORDER {
                let contributed = with_span(
                    self.telemetry.as_deref(),
                    &format!("stage:{}", stage.name()),
                    &[KeyValue::new("platform_jvm_args.stage", stage.name())],
                    || self.run_stage(stage, build_number),
                );
                debug!(stage = stage.name(), count = contributed.len(), "stage composed");
                arguments.extend(contributed);
            }
            arguments
        });
        Ok(drop_blank(arguments))
    }

    fn run_stage(&self, stage: Stage, build_number: &Version) -> Vec<String> {
        let installation = &self.installation;
        match stage {
            Stage::DefaultHeap => default_heap_space(),
            Stage::BootClasspath => boot_classpath(installation.boot_classpath_jar()),
            Stage::VmOptions => load_filtered(installation.vm_options_file().as_deref()),
            Stage::DiagnosticsAgent => diagnostics_agent(build_number, &self.agent_path)
                .into_iter()
                .collect(),
            Stage::AdditionalArguments => additional_jvm_arguments(
                installation.product_metadata(),
                installation.root(),
                host_os(),
            ),
            Stage::HeapOverrides => heap_space(&self.preferences),
        }
    }
}

fn default_heap_space() -> Vec<String> {
    vec![DEFAULT_MAX_HEAP.to_string(), DEFAULT_MIN_HEAP.to_string()]
}

fn boot_classpath(jar: Option<&Path>) -> Vec<String> {
    jar.map(|jar| format!("-Xbootclasspath/a:{}", jar.display()))
        .into_iter()
        .collect()
}

/// Agent flag for builds new enough to load coroutine debug probes.
fn diagnostics_agent(build_number: &Version, agent_path: &Path) -> Option<String> {
    (*build_number >= coroutines_agent_since())
        .then(|| format!("-javaagent:{}", agent_path.display()))
}

/// Recorded JVM arguments without `-D` definitions, or the default
/// `--add-opens` list when nothing usable is recorded.
///
/// The default list is used as-is; only recorded arguments lose their `-D` entries.
fn additional_jvm_arguments(
    metadata: Option<&ProductMetadata>,
    installation_dir: &Path,
    os: &str,
) -> Vec<String> {
    metadata
        .map(|metadata| {
            metadata
                .additional_jvm_arguments
                .iter()
                .filter(|argument| !is_system_property(argument))
                .map(|argument| resolve_ide_home_variable(argument, installation_dir))
                .collect::<Vec<_>>()
        })
        .filter(|arguments| !arguments.is_empty())
        .unwrap_or_else(|| opened_packages(os))
}

fn is_system_property(argument: &str) -> bool {
    argument.starts_with(SYSTEM_PROPERTY_PREFIX)
}

/// Substitute the installation directory for `$IDE_HOME`-style placeholders.
fn resolve_ide_home_variable(argument: &str, installation_dir: &Path) -> String {
    let home = installation_dir.display().to_string();
    let resolved = IDE_HOME_PLACEHOLDERS
        .iter()
        .fold(argument.to_string(), |value, placeholder| {
            value.replace(placeholder, &home)
        })
        .replace("Contents/Contents", "Contents");
    // Bundle paths recorded against `Foo.app/Contents` but installed flat.
    match resolved.split_once('=') {
        Some((_, value)) if value.contains("/Contents") && !Path::new(value).exists() => {
            resolved.replace("/Contents", "")
        }
        _ => resolved,
    }
}

fn heap_space(preferences: &LaunchPreferences) -> Vec<String> {
    [
        preferences
            .max_heap
            .as_deref()
            .map(|size| format!("-Xmx{size}")),
        preferences
            .min_heap
            .as_deref()
            .map(|size| format!("-Xms{size}")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn drop_blank(arguments: Vec<String>) -> Vec<String> {
    arguments
        .into_iter()
        .filter(|argument| !argument.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_harness::InstallationFixture;

    const AGENT: &str = "/opt/agents/coroutines-javaagent.jar";

    fn compose(fixture: &InstallationFixture, preferences: LaunchPreferences) -> Vec<String> {
        ArgumentComposer::new(fixture.path(), AGENT, preferences)
            .compose()
            .expect("compose arguments")
    }

    fn heap_flags(arguments: &[String]) -> Vec<&str> {
        arguments
            .iter()
            .map(String::as_str)
            .filter(|argument| argument.starts_with("-Xmx") || argument.starts_with("-Xms"))
            .collect()
    }

    fn agent_flags(arguments: &[String]) -> Vec<&str> {
        arguments
            .iter()
            .map(String::as_str)
            .filter(|argument| argument.starts_with("-javaagent:"))
            .collect()
    }

    #[test]
    fn bare_installation_gets_defaults_and_opened_packages() {
        let fixture = InstallationFixture::with_build("IC-213.7172.25").expect("fixture");

        let arguments = compose(&fixture, LaunchPreferences::default());

        let mut expected = default_heap_space();
        expected.extend(opened_packages(host_os()));
        assert_eq!(arguments, expected);
    }

    #[test]
    fn composing_twice_is_identical() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");
        fixture.boot_jar().expect("boot jar");
        fixture
            .product_info(Some("bin/idea64.vmoptions"), &["--add-opens=a/b=ALL-UNNAMED"])
            .expect("product info");
        fixture
            .write("bin/idea64.vmoptions", "-Xss2m\n-XX:+UseG1GC\n")
            .expect("vm options");
        let composer = ArgumentComposer::new(
            fixture.path(),
            AGENT,
            LaunchPreferences::new(Some("2g".to_string()), None),
        );

        let first = composer.compose().expect("first composition");
        let second = composer.compose().expect("second composition");
        let fresh = compose(&fixture, LaunchPreferences::new(Some("2g".to_string()), None));

        assert_eq!(first, second);
        assert_eq!(first, fresh);
    }

    #[test]
    fn default_heap_is_the_only_heap_setting_without_preferences() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");

        let arguments = compose(&fixture, LaunchPreferences::default());

        assert_eq!(heap_flags(&arguments), vec!["-Xmx512m", "-Xms256m"]);
        assert_eq!(&arguments[..2], &["-Xmx512m", "-Xms256m"]);
    }

    #[test]
    fn heap_preferences_follow_defaults() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");
        let preferences = LaunchPreferences::new(Some("4g".to_string()), Some("1g".to_string()));

        let arguments = compose(&fixture, preferences);

        assert_eq!(
            heap_flags(&arguments),
            vec!["-Xmx512m", "-Xms256m", "-Xmx4g", "-Xms1g"]
        );
        assert_eq!(&arguments[arguments.len() - 2..], &["-Xmx4g", "-Xms1g"]);
    }

    #[test]
    fn blank_heap_preference_is_ignored() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");
        let preferences = LaunchPreferences::new(Some("  ".to_string()), Some("768m".to_string()));

        let arguments = compose(&fixture, preferences);

        assert_eq!(heap_flags(&arguments), vec!["-Xmx512m", "-Xms256m", "-Xms768m"]);
    }

    #[test]
    fn agent_is_omitted_below_threshold() {
        let fixture = InstallationFixture::with_build("IC-213.7172.25").expect("fixture");

        let arguments = compose(&fixture, LaunchPreferences::default());

        assert!(agent_flags(&arguments).is_empty());
    }

    #[test]
    fn agent_is_attached_at_and_above_threshold() {
        for build in ["IC-221", "IC-221.5080.210", "IU-233.11799.241"] {
            let fixture = InstallationFixture::with_build(build).expect("fixture");

            let arguments = compose(&fixture, LaunchPreferences::default());

            let expected = format!("-javaagent:{}", Path::new(AGENT).display());
            assert_eq!(agent_flags(&arguments), vec![expected.as_str()], "build {build}");
        }
    }

    #[test]
    fn vm_options_keep_order_without_coroutine_switch() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");
        fixture
            .product_info(Some("../bin/idea64.vmoptions"), &[])
            .expect("product info");
        fixture
            .write(
                "bin/idea64.vmoptions",
                "-Xss2m\n-Dkotlinx.coroutines.debug=off\n\n-XX:+UseG1GC\n-Xss2m\n",
            )
            .expect("vm options");

        let arguments = compose(&fixture, LaunchPreferences::default());

        assert_eq!(
            &arguments[2..6],
            &[
                "-Xss2m".to_string(),
                "-XX:+UseG1GC".to_string(),
                "-Xss2m".to_string(),
                format!("-javaagent:{}", Path::new(AGENT).display()),
            ]
        );
        assert!(
            arguments
                .iter()
                .all(|argument| !argument.contains("kotlinx.coroutines.debug=off"))
        );
    }

    #[test]
    fn vm_options_are_skipped_without_metadata() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");
        fixture
            .write("bin/idea64.vmoptions", "-XX:+UseZGC\n")
            .expect("vm options");

        let arguments = compose(&fixture, LaunchPreferences::default());

        assert!(!arguments.iter().any(|argument| argument == "-XX:+UseZGC"));
    }

    #[test]
    fn boot_classpath_follows_default_heap() {
        let fixture = InstallationFixture::with_build("IC-213.7172.25").expect("fixture");
        let jar = fixture.boot_jar().expect("boot jar");

        let arguments = compose(&fixture, LaunchPreferences::default());

        assert_eq!(arguments[2], format!("-Xbootclasspath/a:{}", jar.display()));
    }

    #[test]
    fn recorded_arguments_replace_opened_packages() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");
        fixture
            .product_info(
                None,
                &[
                    "-Didea.vendor.name=JetBrains",
                    "--add-opens=java.base/java.lang=ALL-UNNAMED",
                    "-Xshare:auto",
                    "-javaagent:$IDE_HOME/lib/helper.jar",
                ],
            )
            .expect("product info");

        let arguments = compose(&fixture, LaunchPreferences::default());

        let helper = format!("-javaagent:{}/lib/helper.jar", fixture.path().display());
        assert_eq!(
            &arguments[3..],
            &[
                "--add-opens=java.base/java.lang=ALL-UNNAMED".to_string(),
                "-Xshare:auto".to_string(),
                helper,
            ]
        );
        assert!(!arguments.iter().any(|argument| argument.starts_with("-D")));
    }

    #[test]
    fn empty_recorded_arguments_fall_back_to_opened_packages() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");
        fixture.product_info(None, &[]).expect("product info");

        let arguments = compose(&fixture, LaunchPreferences::default());

        assert_eq!(&arguments[3..], opened_packages(host_os()).as_slice());
    }

    #[test]
    fn only_system_properties_fall_back_to_opened_packages() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");
        fixture
            .product_info(None, &["-Dfoo=bar", "-Didea.paths.selector=IdeaIC2023.1"])
            .expect("product info");

        let arguments = compose(&fixture, LaunchPreferences::default());

        assert_eq!(&arguments[3..], opened_packages(host_os()).as_slice());
    }

    #[test]
    fn blank_entries_are_dropped() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");
        fixture
            .product_info(Some("bin/idea64.vmoptions"), &["  ", "-ea", ""])
            .expect("product info");
        fixture
            .write("bin/idea64.vmoptions", "\n   \n-Xss2m\n\t\n")
            .expect("vm options");

        let arguments = compose(&fixture, LaunchPreferences::default());

        assert!(arguments.iter().all(|argument| !argument.trim().is_empty()));
        assert!(arguments.contains(&"-Xss2m".to_string()));
        assert_eq!(arguments.last().map(String::as_str), Some("-ea"));
    }

    #[test]
    fn full_composition_order() {
        let fixture = InstallationFixture::with_build("IU-232.8660.185").expect("fixture");
        let jar = fixture.boot_jar().expect("boot jar");
        fixture
            .product_info(Some("bin/idea64.vmoptions"), &["-XX:+IgnoreUnrecognizedVMOptions"])
            .expect("product info");
        fixture
            .write("bin/idea64.vmoptions", "-Xmx2048m\n-XX:ReservedCodeCacheSize=512m\n")
            .expect("vm options");
        let preferences = LaunchPreferences::new(Some("3g".to_string()), Some("1g".to_string()));

        let arguments = compose(&fixture, preferences);

        assert_eq!(
            arguments,
            vec![
                "-Xmx512m".to_string(),
                "-Xms256m".to_string(),
                format!("-Xbootclasspath/a:{}", jar.display()),
                "-Xmx2048m".to_string(),
                "-XX:ReservedCodeCacheSize=512m".to_string(),
                format!("-javaagent:{}", Path::new(AGENT).display()),
                "-XX:+IgnoreUnrecognizedVMOptions".to_string(),
                "-Xmx3g".to_string(),
                "-Xms1g".to_string(),
            ]
        );
    }

    #[test]
    fn missing_build_number_yields_no_arguments() {
        let fixture = InstallationFixture::empty().expect("fixture");
        fixture.product_info(None, &["-ea"]).expect("product info");

        let result = ArgumentComposer::new(fixture.path(), AGENT, LaunchPreferences::default())
            .compose();

        let error = result.err().expect("invalid installation");
        assert!(format!("{error}").starts_with("invalid installation"));
    }

    #[test]
    fn concurrent_composition_agrees() {
        let fixture = InstallationFixture::with_build("IC-231.8109.175").expect("fixture");
        fixture
            .product_info(Some("bin/idea64.vmoptions"), &["-ea"])
            .expect("product info");
        fixture
            .write("bin/idea64.vmoptions", "-Xss2m\n")
            .expect("vm options");
        let composer = ArgumentComposer::new(fixture.path(), AGENT, LaunchPreferences::default());

        let results: Vec<Vec<String>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| composer.compose().expect("compose arguments")))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("join composer thread"))
                .collect()
        });

        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn resolve_ide_home_variable_substitutes_all_placeholders() {
        let root = Path::new("/opt/idea");

        assert_eq!(
            resolve_ide_home_variable("-javaagent:$IDE_HOME/lib/a.jar", root),
            "-javaagent:/opt/idea/lib/a.jar"
        );
        assert_eq!(
            resolve_ide_home_variable("-Xbootclasspath/a:%IDE_HOME%/lib/b.jar", root),
            "-Xbootclasspath/a:/opt/idea/lib/b.jar"
        );
        assert_eq!(
            resolve_ide_home_variable("--add-opens=java.base/java.io=ALL-UNNAMED", root),
            "--add-opens=java.base/java.io=ALL-UNNAMED"
        );
    }

    #[test]
    fn resolve_ide_home_variable_collapses_bundle_contents() {
        let root = Path::new("/Applications/IDEA.app/Contents");

        assert_eq!(
            resolve_ide_home_variable("-javaagent:$APP_PACKAGE/Contents/lib/a.jar", root),
            "-javaagent:/Applications/IDEA.app/Contents/lib/a.jar"
        );
    }

    #[test]
    fn resolve_ide_home_variable_drops_contents_for_flat_layout() {
        let fixture = InstallationFixture::with_build("IC-231.1").expect("fixture");

        let resolved = resolve_ide_home_variable(
            "-Djna.boot.library.path=$IDE_HOME/Contents/lib/jna",
            fixture.path(),
        );

        assert_eq!(
            resolved,
            format!("-Djna.boot.library.path={}/lib/jna", fixture.path().display())
        );
    }
}
