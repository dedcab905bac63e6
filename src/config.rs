use crate::gfx::Renderer;
use crate::logging::{LogLevel, LogMode};
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_PATH: &str = "rendev.ini";

const SECTION: &str = "Graphics";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content);
        Ok(())
    }

    /// Replaces the current contents with the sections found in `content`.
    /// Keys outside any section land in the "" section.
    pub fn parse(&mut self, content: &str) {
        self.sections.clear();
        let mut current = String::new();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current = name.trim().to_string();
                self.sections.entry(current.clone()).or_default();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            self.sections
                .entry(current.clone())
                .or_default()
                .insert(key.to_string(), value.trim().to_string());
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    pub fn get_section(&self, section: &str) -> Option<&HashMap<String, String>> {
        self.sections.get(section)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GfxConfig {
    pub renderer: Renderer,
    pub vsync: bool,
    /// Requests a debug context from the driver.
    pub gfx_debug: bool,
    pub logging: LogMode,
    pub log_level: LogLevel,
}

impl Default for GfxConfig {
    fn default() -> Self {
        Self {
            renderer: Renderer::Unspecified,
            vsync: true,
            gfx_debug: false,
            logging: LogMode::Default,
            log_level: LogLevel::Warn,
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    let v = v.trim();
    if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("on") {
        Some(true)
    } else if v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        v.parse::<u8>().ok().map(|n| n != 0)
    }
}

#[inline(always)]
const fn bool_str(v: bool) -> &'static str {
    if v { "1" } else { "0" }
}

impl GfxConfig {
    /// Reads the `[Graphics]` section, falling back to the default for any
    /// key that is missing or malformed.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let default = Self::default();
        let get = |key| conf.get(SECTION, key);

        let renderer = get("Renderer")
            .and_then(|v| match Renderer::from_str(v) {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!("{e}; using the default renderer.");
                    None
                }
            })
            .unwrap_or(default.renderer);

        Self {
            renderer,
            vsync: get("Vsync").and_then(parse_bool).unwrap_or(default.vsync),
            gfx_debug: get("GfxDebug")
                .and_then(parse_bool)
                .unwrap_or(default.gfx_debug),
            logging: get("Logging")
                .and_then(|v| LogMode::from_str(v).ok())
                .unwrap_or(default.logging),
            log_level: get("LogLevel")
                .and_then(|v| LogLevel::from_str(v).ok())
                .unwrap_or(default.log_level),
        }
    }

    /// Serializes to INI with keys in alphabetical order.
    pub fn to_ini_string(&self) -> String {
        let mut content = String::new();
        content.push_str(&format!("[{SECTION}]\n"));
        content.push_str(&format!("GfxDebug={}\n", bool_str(self.gfx_debug)));
        content.push_str(&format!("LogLevel={}\n", self.log_level));
        content.push_str(&format!("Logging={}\n", self.logging));
        content.push_str(&format!("Renderer={}\n", self.renderer));
        content.push_str(&format!("Vsync={}\n", bool_str(self.vsync)));
        content
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        std::fs::write(path, self.to_ini_string())
    }

    /// Loads `path`, creating it with default values first when it does
    /// not exist. Any failure yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("'{}' not found, creating with default values.", path.display());
            if let Err(e) = Self::default().save(path) {
                warn!("Failed to create default config file: {e}");
            }
        }

        let mut conf = SimpleIni::new();
        match conf.load(path) {
            Ok(()) => {
                let cfg = Self::from_ini(&conf);
                info!("Configuration loaded from '{}'.", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load '{}': {e}. Using defaults.", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(content: &str) -> GfxConfig {
        let mut ini = SimpleIni::new();
        ini.parse(content);
        GfxConfig::from_ini(&ini)
    }

    #[test]
    fn reader_handles_comments_and_whitespace() {
        let mut ini = SimpleIni::new();
        ini.parse("; header\nTop = 1\n[ Graphics ]\n# note\n  Vsync =  0  \n=orphan\nnovalue\n");
        assert_eq!(ini.get("", "Top"), Some("1"));
        assert_eq!(ini.get("Graphics", "Vsync"), Some("0"));
        assert_eq!(ini.get_section("Graphics").map(HashMap::len), Some(1));
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parsed(""), GfxConfig::default());
    }

    #[test]
    fn graphics_keys_override_defaults() {
        let cfg = parsed(
            "[Graphics]\nRenderer=OpenGL\nVsync=off\nGfxDebug=1\nLogging=All\nLogLevel=debug\n",
        );
        assert_eq!(
            cfg,
            GfxConfig {
                renderer: Renderer::OpenGl,
                vsync: false,
                gfx_debug: true,
                logging: LogMode::All,
                log_level: LogLevel::Debug,
            }
        );
    }

    #[test]
    fn malformed_values_fall_back_per_key() {
        let cfg = parsed("[Graphics]\nRenderer=Vulkan\nVsync=maybe\nLogging=None\n");
        assert_eq!(cfg.renderer, Renderer::Unspecified);
        assert!(cfg.vsync);
        assert_eq!(cfg.logging, LogMode::None);
    }

    #[test]
    fn keys_in_other_sections_are_ignored() {
        let cfg = parsed("[Options]\nVsync=0\n");
        assert!(cfg.vsync);
    }

    #[test]
    fn written_file_reads_back() {
        let cfg = GfxConfig {
            renderer: Renderer::D3d11,
            vsync: false,
            gfx_debug: true,
            logging: LogMode::None,
            log_level: LogLevel::Trace,
        };
        assert_eq!(parsed(&cfg.to_ini_string()), cfg);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = std::env::temp_dir().join(format!("rendev-test-{}.ini", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let cfg = GfxConfig::load(&path);
        assert_eq!(cfg, GfxConfig::default());
        let written = std::fs::read_to_string(&path).unwrap_or_default();
        assert!(written.starts_with("[Graphics]\n"));
        assert!(written.contains("Vsync=1\n"));

        let _ = std::fs::remove_file(&path);
    }
}
