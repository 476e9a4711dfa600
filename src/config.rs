//! 程序配置
//!
//! 解析顺序：内置默认值 → 可选的 TOML 文件 → 环境变量。
//! 解析后的 `Config` 不再修改，按值交给每次链运行

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ConfigError;

/// 未设置 `QUIZ_CONFIG` 时读取的默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "quiz_solver.toml";

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- 调用方身份 ---
    pub email: String,
    pub secret: SecretString,
    // --- LLM 配置 ---
    pub llm_api_key: SecretString,
    pub llm_api_base_url: String,
    /// 从页面文本提取题目的模型
    pub extraction_model: String,
    /// 解答题目的模型
    pub solver_model: String,
    // --- Webhook 服务 ---
    pub host: String,
    pub port: u16,
    // --- 链运行时间 ---
    /// 单次链运行的总时间预算
    pub chain_budget: Duration,
    /// 两个步骤之间的停顿
    pub step_delay: Duration,
    /// 导航完成后等待客户端渲染的时间
    ///
    /// `goto` 只等到 load 事件，这段固定等待代替"网络空闲"等待
    pub render_settle_delay: Duration,
    pub navigation_timeout: Duration,
    /// 文件下载、答案提交和 LLM 调用的超时
    pub http_timeout: Duration,
    /// 剩余时间低于此值时解答步骤会警告
    pub safety_margin: Duration,
    /// 每个文件交给解答模型的摘要字符上限
    pub file_excerpt_chars: usize,
    // --- 其他 ---
    pub chrome_executable: Option<String>,
    pub output_log_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email: String::new(),
            secret: SecretString::from(String::new()),
            llm_api_key: SecretString::from(String::new()),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            extraction_model: "gpt-4o-mini".to_string(),
            solver_model: "gpt-4o".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            chain_budget: Duration::from_secs(180),
            step_delay: Duration::from_millis(1000),
            render_settle_delay: Duration::from_millis(2000),
            navigation_timeout: Duration::from_secs(30),
            http_timeout: Duration::from_secs(30),
            safety_margin: Duration::from_secs(30),
            file_excerpt_chars: 2000,
            chrome_executable: None,
            output_log_file: None,
        }
    }
}

/// 可选的 TOML 覆盖项，每个键对应 `Config` 的一个字段
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    email: Option<String>,
    secret: Option<String>,
    llm_api_key: Option<String>,
    llm_api_base_url: Option<String>,
    extraction_model: Option<String>,
    solver_model: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    chain_budget_secs: Option<u64>,
    step_delay_ms: Option<u64>,
    render_settle_ms: Option<u64>,
    navigation_timeout_secs: Option<u64>,
    http_timeout_secs: Option<u64>,
    safety_margin_secs: Option<u64>,
    file_excerpt_chars: Option<usize>,
    chrome_executable: Option<String>,
    output_log_file: Option<String>,
}

/// 已读入内存的配置文件
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// 文件路径，只用于错误信息
    pub path: String,
    pub text: String,
}

impl ConfigSource {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// 读取配置文件，文件不存在时返回 `None`
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(path)
            .map(|text| Some(Self::new(path.display().to_string(), text)))
            .map_err(|e| ConfigError::FileUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

impl Config {
    /// 加载并校验程序配置
    ///
    /// 凭证缺失在这里就报错，进程不会在没有凭证的情况下开始服务
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("QUIZ_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let source = ConfigSource::read(Path::new(&path))?;
        let config = Self::resolve(source.as_ref(), |key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 由可选的配置文件和变量查询函数构建配置
    ///
    /// # 参数
    /// - `source`: 配置文件内容（存在时）
    /// - `lookup`: 环境变量访问函数，未设置时返回 `None`
    ///
    /// # 返回
    /// 解析后的配置（尚未校验凭证）
    pub fn resolve<F>(source: Option<&ConfigSource>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ConfigFile = match source {
            Some(source) => toml::from_str(&source.text).map_err(|e| ConfigError::FileUnreadable {
                path: source.path.clone(),
                reason: e.to_string(),
            })?,
            None => ConfigFile::default(),
        };
        let default = Self::default();

        let string = |var: &str, from_file: Option<String>, fallback: String| {
            lookup(var).or(from_file).unwrap_or(fallback)
        };

        Ok(Self {
            email: string("STUDENT_EMAIL", file.email, default.email),
            secret: SecretString::from(string(
                "STUDENT_SECRET",
                file.secret,
                String::new(),
            )),
            llm_api_key: SecretString::from(string(
                "OPENAI_API_KEY",
                file.llm_api_key,
                String::new(),
            )),
            llm_api_base_url: string(
                "LLM_API_BASE_URL",
                file.llm_api_base_url,
                default.llm_api_base_url,
            ),
            extraction_model: string(
                "EXTRACTION_MODEL",
                file.extraction_model,
                default.extraction_model,
            ),
            solver_model: string("SOLVER_MODEL", file.solver_model, default.solver_model),
            host: string("HOST", file.host, default.host),
            port: parse_var(&lookup, "PORT", "port number")?
                .or(file.port)
                .unwrap_or(default.port),
            chain_budget: parse_var(&lookup, "CHAIN_BUDGET_SECS", "number of seconds")?
                .or(file.chain_budget_secs)
                .map(Duration::from_secs)
                .unwrap_or(default.chain_budget),
            step_delay: parse_var(&lookup, "STEP_DELAY_MS", "number of milliseconds")?
                .or(file.step_delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(default.step_delay),
            render_settle_delay: parse_var(&lookup, "RENDER_SETTLE_MS", "number of milliseconds")?
                .or(file.render_settle_ms)
                .map(Duration::from_millis)
                .unwrap_or(default.render_settle_delay),
            navigation_timeout: parse_var(&lookup, "NAVIGATION_TIMEOUT_SECS", "number of seconds")?
                .or(file.navigation_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(default.navigation_timeout),
            http_timeout: parse_var(&lookup, "HTTP_TIMEOUT_SECS", "number of seconds")?
                .or(file.http_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(default.http_timeout),
            safety_margin: parse_var(&lookup, "SAFETY_MARGIN_SECS", "number of seconds")?
                .or(file.safety_margin_secs)
                .map(Duration::from_secs)
                .unwrap_or(default.safety_margin),
            file_excerpt_chars: parse_var(&lookup, "FILE_EXCERPT_CHARS", "character count")?
                .or(file.file_excerpt_chars)
                .unwrap_or(default.file_excerpt_chars),
            chrome_executable: lookup("CHROME_EXECUTABLE").or(file.chrome_executable),
            output_log_file: lookup("OUTPUT_LOG_FILE").or(file.output_log_file),
        })
    }

    /// 检查调用方身份和模型凭证是否齐全
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("STUDENT_EMAIL", self.email_configured()),
            ("STUDENT_SECRET", self.secret_configured()),
            ("OPENAI_API_KEY", self.openai_configured()),
        ];
        for (var_name, present) in required {
            if !present {
                return Err(ConfigError::Missing {
                    var_name: var_name.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn email_configured(&self) -> bool {
        !self.email.trim().is_empty()
    }

    pub fn secret_configured(&self) -> bool {
        !self.secret.expose_secret().trim().is_empty()
    }

    pub fn openai_configured(&self) -> bool {
        !self.llm_api_key.expose_secret().trim().is_empty()
    }

    /// 单元测试用的完整配置（无等待）
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            email: "student@example.com".to_string(),
            secret: SecretString::from("s3cret".to_string()),
            llm_api_key: SecretString::from("sk-test".to_string()),
            step_delay: Duration::ZERO,
            render_settle_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn parse_var<T, F>(lookup: &F, var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}
