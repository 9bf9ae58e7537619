//! 配置校验模块
//!
//! 校验规则：
//! - queue_capacity > 0
//! - failure_channel_capacity > 0
//! - destination name 非空且唯一
//! - file 类型必须提供 path 参数

use std::collections::HashSet;

use contracts::{ContractError, DestinationKind, FanoutBlueprint};

/// 校验 FanoutBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &FanoutBlueprint) -> Result<(), ContractError> {
    validate_dispatcher(blueprint)?;
    validate_destination_names(blueprint)?;
    validate_destination_params(blueprint)?;
    Ok(())
}

/// 校验 dispatcher 参数
fn validate_dispatcher(blueprint: &FanoutBlueprint) -> Result<(), ContractError> {
    let config = &blueprint.dispatcher;

    if config.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "dispatcher.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }

    if config.failure_channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "dispatcher.failure_channel_capacity",
            "failure_channel_capacity must be > 0",
        ));
    }

    Ok(())
}

/// 校验 destination 名称
fn validate_destination_names(blueprint: &FanoutBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, destination) in blueprint.destinations.iter().enumerate() {
        if destination.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{}].name", idx),
                "destination name cannot be empty",
            ));
        }
        if !seen.insert(destination.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("destinations[name={}]", destination.name),
                "duplicate destination name",
            ));
        }
    }
    Ok(())
}

/// 校验类型特定参数
fn validate_destination_params(blueprint: &FanoutBlueprint) -> Result<(), ContractError> {
    for destination in &blueprint.destinations {
        if destination.kind == DestinationKind::File
            && destination.param("path").is_none_or(str::is_empty)
        {
            return Err(ContractError::config_validation(
                format!("destinations[{}].params.path", destination.name),
                "file destination requires a non-empty path",
            ));
        }
    }
    Ok(())
}
