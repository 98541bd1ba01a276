use std::sync::Arc;

use dashmap::DashMap;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use shared::message::{BusMessage, SyncPayload};

use crate::checkout::{CheckoutDeps, CheckoutSessions};
use crate::core::Config;
use crate::db::DbService;
use crate::message::MessageBus;
use crate::notify::{ConfirmationNotifier, NoopNotifier, SesNotifier};
use crate::payments::{PaymentGateway, StripeGateway};

/// 资源版本管理器
///
/// 使用 DashMap 实现无锁并发的版本号管理。
/// 每种资源类型维护独立的版本号，支持原子递增。
///
/// # 使用场景
///
/// 用于 broadcast_sync 时自动生成递增的版本号，
/// 确保订阅方可以通过版本号判断数据新旧。
#[derive(Debug)]
pub struct ResourceVersions {
    versions: DashMap<String, u64>,
}

impl ResourceVersions {
    /// 创建空的版本管理器
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
        }
    }

    /// 递增指定资源的版本号并返回新值
    ///
    /// 如果资源不存在，从 0 开始递增（返回 1）
    pub fn increment(&self, resource: &str) -> u64 {
        let mut entry = self.versions.entry(resource.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// 获取指定资源的当前版本号
    ///
    /// 如果资源不存在，返回 0
    pub fn get(&self, resource: &str) -> u64 {
        self.versions.get(resource).map(|v| *v).unwrap_or(0)
    }
}

impl Default for ResourceVersions {
    fn default() -> Self {
        Self::new()
    }
}

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是店面服务的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，克隆成本极低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | 嵌入式数据库 |
/// | message_bus | 变更广播总线 |
/// | checkout_sessions | 结账会话注册表 |
/// | payments | 支付网关 |
/// | notifier | 订单确认通知器 |
/// | resource_versions | 资源版本管理 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 变更广播总线
    pub message_bus: MessageBus,
    /// 结账会话注册表
    pub checkout_sessions: CheckoutSessions,
    /// 支付网关
    pub payments: Arc<dyn PaymentGateway>,
    /// 订单确认通知器
    pub notifier: Arc<dyn ConfirmationNotifier>,
    /// 资源版本管理器 (用于 broadcast_sync 自动递增版本号)
    pub resource_versions: Arc<ResourceVersions>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/storefront.db)
    /// 3. 消息总线、支付网关、通知器、会话注册表
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        let db_path = config.database_dir().join("storefront.db");
        let db_service = DbService::new(&db_path.to_string_lossy())
            .await
            .expect("Failed to initialize database");

        let notifier: Arc<dyn ConfirmationNotifier> = match &config.ses_from_email {
            Some(from) => {
                let aws_config =
                    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                let ses = aws_sdk_sesv2::Client::new(&aws_config);
                Arc::new(SesNotifier::new(ses, from.clone()))
            }
            None => Arc::new(NoopNotifier),
        };

        Self::with_services(
            config.clone(),
            db_service.db,
            Arc::new(StripeGateway::new(config.stripe_secret_key.clone())),
            notifier,
        )
    }

    /// 以自定义服务构造状态 (测试注入桩网关/通知器)
    pub fn with_services(
        config: Config,
        db: Surreal<Db>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn ConfirmationNotifier>,
    ) -> Self {
        Self {
            config,
            db,
            message_bus: MessageBus::new(),
            checkout_sessions: CheckoutSessions::new(),
            payments,
            notifier,
            resource_versions: Arc::new(ResourceVersions::new()),
        }
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 结账流程的数据访问集合
    pub fn checkout_deps(&self) -> CheckoutDeps {
        CheckoutDeps::new(self.db.clone())
    }

    /// 广播同步消息
    ///
    /// 向所有订阅方广播资源变更通知。
    /// 版本号由 ResourceVersions 自动递增管理。
    ///
    /// # 参数
    /// - `resource`: 资源类型 (如 "menu_item", "category", "address")
    /// - `action`: 变更类型 ("created", "updated", "deleted")
    /// - `id`: 资源 ID
    /// - `data`: 资源数据 (deleted 时为 None)
    pub async fn broadcast_sync<T: serde::Serialize>(
        &self,
        resource: &str,
        action: &str,
        id: &str,
        data: Option<&T>,
    ) {
        let version = self.resource_versions.increment(resource);
        let payload = SyncPayload {
            resource: resource.to_string(),
            version,
            action: action.to_string(),
            id: id.to_string(),
            data: data.and_then(|d| serde_json::to_value(d).ok()),
        };
        let _ = self.message_bus.publish(BusMessage::sync(&payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_versions_increment_per_resource() {
        let versions = ResourceVersions::new();
        assert_eq!(versions.get("menu_item"), 0);
        assert_eq!(versions.increment("menu_item"), 1);
        assert_eq!(versions.increment("menu_item"), 2);
        assert_eq!(versions.increment("address"), 1);
        assert_eq!(versions.get("menu_item"), 2);
    }
}
