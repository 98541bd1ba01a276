//! Storefront Server - 餐厅在线点餐服务
//!
//! # 架构概述
//!
//! 本模块是店面服务的主入口，提供以下核心功能：
//!
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储
//! - **结账** (`checkout`): 商品解析、计价、下单、支付状态机
//! - **消息** (`message`): 资源变更广播总线
//! - **支付** (`payments`): 支付处理器集成 (Stripe REST)
//! - **通知** (`notify`): 订单确认邮件 (best-effort)
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! storefront-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── db/            # 数据库层 (模型在 shared)
//! ├── checkout/      # 结账流程
//! ├── message/       # 变更广播
//! ├── payments/      # 支付处理器
//! ├── notify/        # 订单确认通知
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod checkout;
pub mod core;
pub mod db;
pub mod message;
pub mod notify;
pub mod payments;
pub mod utils;

// Re-export 公共类型
pub use checkout::{CheckoutSession, CheckoutSessions};
pub use core::{Config, Server, ServerState};
pub use message::MessageBus;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() -> anyhow::Result<()> {
    // .env 缺失不是错误
    let _ = dotenv::dotenv();

    let log_level = std::env::var("LOG_LEVEL").ok();
    init_logger_with_file(log_level.as_deref(), None);

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   _____ __                  ____                 __
  / ___// /_____  ________  / __/________  ____  / /_
  \__ \/ __/ __ \/ ___/ _ \/ /_/ ___/ __ \/ __ \/ __/
 ___/ / /_/ /_/ / /  /  __/ __/ /  / /_/ / / / / /_
/____/\__/\____/_/   \___/_/ /_/   \____/_/ /_/\__/
    "#
    );
}
