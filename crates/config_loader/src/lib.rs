//! # Config Loader
//!
//! 分发配置加载模块。
//!
//! 负责：
//! - 按扩展名识别 TOML / JSON
//! - 解析后立即校验，返回可直接使用的 `FanoutBlueprint`
//! - 将蓝图写回磁盘（格式同样由扩展名决定）
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("fanout.toml")).unwrap();
//! println!("queue capacity: {}", blueprint.dispatcher.queue_capacity);
//! ```

mod parser;
mod validator;

pub use contracts::FanoutBlueprint;
pub use parser::ConfigFormat;
pub use validator::validate;

use contracts::ContractError;
use std::path::Path;

/// 蓝图加载与序列化入口
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从文件加载并校验蓝图。
    ///
    /// 格式由扩展名决定 (`.toml` / `.json`)；读取失败时错误信息带上路径。
    pub fn load_from_path(path: &Path) -> Result<FanoutBlueprint, ContractError> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
            message: format!("cannot read {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::load_from_str(&content, format)
    }

    /// 有路径则加载，否则使用默认蓝图
    pub fn load_or_default(path: Option<&Path>) -> Result<FanoutBlueprint, ContractError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(FanoutBlueprint::default()),
        }
    }

    /// 解析字符串并校验
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<FanoutBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validate(&blueprint)?;
        Ok(blueprint)
    }

    /// 按指定格式序列化
    pub fn serialize(
        blueprint: &FanoutBlueprint,
        format: ConfigFormat,
    ) -> Result<String, ContractError> {
        match format {
            ConfigFormat::Toml => Self::to_toml(blueprint),
            ConfigFormat::Json => Self::to_json(blueprint),
        }
    }

    pub fn to_toml(blueprint: &FanoutBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint).map_err(|e| ContractError::ConfigParse {
            message: "TOML serialize error".into(),
            source: Some(Box::new(e)),
        })
    }

    pub fn to_json(blueprint: &FanoutBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint).map_err(|e| ContractError::ConfigParse {
            message: "JSON serialize error".into(),
            source: Some(Box::new(e)),
        })
    }

    /// 校验后写入文件，格式由扩展名决定
    pub fn save_to_path(blueprint: &FanoutBlueprint, path: &Path) -> Result<(), ContractError> {
        validate(blueprint)?;
        let content = Self::serialize(blueprint, format_of(path)?)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn format_of(path: &Path) -> Result<ConfigFormat, ContractError> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Err(ContractError::config_parse(format!(
            "{}: no file extension to infer the config format from",
            path.display()
        )));
    };
    ConfigFormat::from_extension(ext)
        .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
}
