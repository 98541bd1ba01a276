//! Order Repository
//!
//! 订单创建是单个事务：逐行对权威记录做可售/价格复验，
//! 任何一行失败即 THROW，头和行全部回滚 (全有或全无)。
//! 校验失败的消息点名失败行，原样转述给用户。
//!
//! 权威记录缺失的行不拦截 —— 解析回退链允许按快照价成交，
//! 这是刻意的韧性策略，不是错误。

use super::{BaseRepository, RepoError, RepoResult, new_record_key, strip_table_prefix};
use shared::ProductRef;
use shared::checkout::OrderTotals;
use shared::models::{Order, OrderAddress, OrderLine, PaymentState, VariantSelection};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const ORDER_TABLE: &str = "order";

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Atomically create an order with its lines
    ///
    /// 每行携带下单瞬间的单价快照；事务内按行复验：
    /// - 记录存在但不可售 -> THROW (库存校验)
    /// - 记录存在但现价与快照价不符 -> THROW (价格校验)
    /// - 记录缺失 -> 放行 (按快照成交)
    #[allow(clippy::too_many_arguments)]
    pub async fn create_with_lines(
        &self,
        owner: Option<String>,
        guest_email: Option<String>,
        lines: Vec<OrderLine>,
        selections: &[Option<VariantSelection>],
        address: OrderAddress,
        totals: OrderTotals,
        discount_code: Option<String>,
    ) -> RepoResult<Order> {
        if lines.is_empty() {
            return Err(RepoError::Validation("order must contain at least one line".into()));
        }

        let order_key = new_record_key();
        let order = Order {
            id: None,
            owner,
            guest_email,
            lines: lines.clone(),
            address,
            totals,
            discount_code,
            payment_state: PaymentState::Unpaid,
            payment_intent: None,
            placed_at: chrono::Utc::now().timestamp_millis(),
        };

        // 逐行生成复验语句
        let mut stmts = String::from("BEGIN TRANSACTION;\n");
        for (i, line) in lines.iter().enumerate() {
            let (avail_expr, price_expr) = validation_exprs(&line.product_ref, i, selections.get(i).and_then(|s| s.as_ref()));
            stmts.push_str(&format!(
                "LET $rec{i} = (SELECT * FROM ONLY type::thing($t{i}, $k{i}));\n\
                 IF $rec{i} != NONE {{\n\
                     IF !({avail_expr}) {{ THROW $unavailable{i} }};\n\
                     IF math::abs(({price_expr}) - $p{i}) > 0.005 {{ THROW $changed{i} }};\n\
                 }};\n"
            ));
        }
        stmts.push_str(
            "CREATE type::thing('order', $order_key) CONTENT $order RETURN NONE;\n\
             COMMIT TRANSACTION;",
        );

        let mut query = self
            .base
            .db()
            .query(&stmts)
            .bind(("order_key", order_key.clone()))
            .bind(("order", order));

        for (i, line) in lines.iter().enumerate() {
            let line_no = i + 1;
            query = query
                .bind((format!("t{i}"), line.product_ref.table()))
                .bind((
                    format!("k{i}"),
                    strip_table_prefix(line.product_ref.table(), line.product_ref.id()).to_string(),
                ))
                .bind((format!("p{i}"), line.unit_price))
                .bind((
                    format!("unavailable{i}"),
                    format!("Line {line_no} ({}): currently unavailable", line.name),
                ))
                .bind((
                    format!("changed{i}"),
                    format!("Line {line_no} ({}): price has changed", line.name),
                ));
            if let Some(Some(sel)) = selections.get(i) {
                let sel_id = match sel {
                    VariantSelection::Variant(id) | VariantSelection::Combination(id) => id.clone(),
                };
                query = query.bind((format!("sel{i}"), sel_id));
            }
        }

        let mut response = query.await?;
        let errors = response.take_errors();
        if !errors.is_empty() {
            return Err(map_rejection(errors));
        }

        self.find_by_id(&order_key)
            .await?
            .ok_or_else(|| RepoError::Database("Order vanished after creation".to_string()))
    }

    /// Find order by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let key = strip_table_prefix(ORDER_TABLE, id).to_string();
        let order: Option<Order> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key)")
            .bind(("tb", ORDER_TABLE))
            .bind(("key", key))
            .await?
            .take(0)?;
        Ok(order)
    }

    /// Order history for an owner, newest first
    pub async fn find_by_owner(&self, owner: &str) -> RepoResult<Vec<Order>> {
        let owner = owner.to_string();
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM `order` WHERE owner = $owner ORDER BY placed_at DESC")
            .bind(("owner", owner))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// Attach the payment-authorization handle to an order
    pub async fn set_payment_intent(&self, id: &str, intent_id: &str) -> RepoResult<()> {
        let key = strip_table_prefix(ORDER_TABLE, id).to_string();
        let intent_id = intent_id.to_string();
        self.base
            .db()
            .query("UPDATE type::thing($tb, $key) SET payment_intent = $intent RETURN NONE")
            .bind(("tb", ORDER_TABLE))
            .bind(("key", key))
            .bind(("intent", intent_id))
            .await?
            .check()?;
        Ok(())
    }

    /// Transition payment state
    ///
    /// 幂等：订单已是目标状态时为空操作。
    pub async fn set_payment_state(&self, id: &str, state: PaymentState) -> RepoResult<Order> {
        let key = strip_table_prefix(ORDER_TABLE, id).to_string();
        let updated: Option<Order> = self
            .base
            .db()
            .query(
                "UPDATE type::thing($tb, $key) SET payment_state = $state RETURN NONE;
                 SELECT *, type::string(id) AS id FROM ONLY type::thing($tb, $key);",
            )
            .bind(("tb", ORDER_TABLE))
            .bind(("key", key))
            .bind(("state", state))
            .await?
            .take(1)?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Order {} not found", id)))
    }

    /// Find order by its payment intent id (webhook / redirect-return path)
    pub async fn find_by_payment_intent(&self, intent_id: &str) -> RepoResult<Option<Order>> {
        let intent_id = intent_id.to_string();
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT *, type::string(id) AS id FROM `order` WHERE payment_intent = $intent")
            .bind(("intent", intent_id))
            .await?
            .take(0)?;
        Ok(orders.into_iter().next())
    }
}

/// 按后备表与规格选择生成可售性与现价表达式
fn validation_exprs(
    product_ref: &ProductRef,
    i: usize,
    selection: Option<&VariantSelection>,
) -> (String, String) {
    match product_ref {
        ProductRef::MenuItem(_) => {
            let avail = format!("$rec{i}.is_available");
            let price = match selection {
                Some(VariantSelection::Variant(_)) => format!(
                    "array::first((SELECT VALUE price FROM $rec{i}.variants WHERE id = $sel{i})) ?? $rec{i}.price"
                ),
                Some(VariantSelection::Combination(_)) => format!(
                    "array::first((SELECT VALUE price FROM $rec{i}.combinations WHERE id = $sel{i})) ?? $rec{i}.price"
                ),
                None => format!("$rec{i}.price"),
            };
            (avail, price)
        }
        ProductRef::Dish(_) => (format!("$rec{i}.available"), format!("$rec{i}.price")),
        ProductRef::Legacy(_) => (format!("$rec{i}.in_stock > 0"), format!("$rec{i}.unit_price")),
    }
}

/// 把事务 THROW 映射为 Rejected，保留点名失败行的原始消息
///
/// 事务被中止时其余语句报 "failed transaction" 连带错误，
/// 要在全部错误里挑出真正 THROW 的那条。
fn map_rejection(errors: std::collections::HashMap<usize, surrealdb::Error>) -> RepoError {
    // SurrealDB 将 THROW 'x' 包装为 "An error occurred: x"
    let thrown = errors.values().find_map(|e| {
        e.to_string()
            .split("An error occurred: ")
            .nth(1)
            .map(|s| s.trim().to_string())
    });

    match thrown {
        Some(msg) => RepoError::Rejected(msg),
        None => {
            let first = errors
                .into_values()
                .next()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown transaction error".to_string());
            RepoError::Database(first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::MenuItemRepository;
    use shared::models::MenuItemCreate;

    fn make_address() -> OrderAddress {
        OrderAddress {
            full_name: "Ana García".into(),
            line1: "Calle Mayor 1".into(),
            line2: None,
            city: "Madrid".into(),
            region: "Madrid".into(),
            postal_code: "28013".into(),
            country: "ES".into(),
            phone: None,
        }
    }

    fn make_totals(grand_total: f64) -> OrderTotals {
        OrderTotals {
            subtotal: grand_total,
            delivery_fee: 0.0,
            tax: 0.0,
            discount: 0.0,
            grand_total,
        }
    }

    fn make_line(product_ref: ProductRef, name: &str, unit_price: f64, quantity: i32) -> OrderLine {
        OrderLine {
            product_ref,
            name: name.to_string(),
            variant_name: None,
            unit_price,
            quantity,
            line_total: unit_price * quantity as f64,
        }
    }

    async fn seed_item(db: &DbService, name: &str, price: f64) -> String {
        let repo = MenuItemRepository::new(db.db.clone());
        repo.create(MenuItemCreate {
            name: name.to_string(),
            description: None,
            image: None,
            category: "category:main".to_string(),
            price,
            sort_order: None,
            variants: None,
            combinations: None,
        })
        .await
        .unwrap()
        .id
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_validates_price_against_record() {
        let db = DbService::new_in_memory().await.unwrap();
        let repo = OrderRepository::new(db.db.clone());
        let item_id = seed_item(&db, "Margherita Pizza", 450.0).await;

        // 提交过期价格：事务 THROW，无订单产生
        let line = make_line(ProductRef::MenuItem(item_id), "Margherita Pizza", 400.0, 1);
        let result = repo
            .create_with_lines(
                Some("guest:g1".into()),
                None,
                vec![line],
                &[None],
                make_address(),
                make_totals(400.0),
                None,
            )
            .await;

        match result {
            Err(RepoError::Rejected(msg)) => {
                assert!(msg.contains("price has changed"), "message was: {msg}");
                assert!(msg.contains("Margherita Pizza"));
            }
            other => panic!("Expected Rejected, got {other:?}"),
        }
        assert!(repo.find_by_owner("guest:g1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_allows_missing_record_snapshot_sale() {
        let db = DbService::new_in_memory().await.unwrap();
        let repo = OrderRepository::new(db.db.clone());

        // 权威记录不存在：按快照价成交，不拦截
        let line = make_line(
            ProductRef::Dish("dish:gone".into()),
            "Deleted Dish",
            120.0,
            2,
        );
        let order = repo
            .create_with_lines(
                Some("guest:g1".into()),
                Some("ana@example.com".into()),
                vec![line],
                &[None],
                make_address(),
                make_totals(240.0),
                None,
            )
            .await
            .unwrap();

        assert_eq!(order.payment_state, PaymentState::Unpaid);
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].unit_price, 120.0);
    }

    #[tokio::test]
    async fn test_payment_state_transition_is_idempotent() {
        let db = DbService::new_in_memory().await.unwrap();
        let repo = OrderRepository::new(db.db.clone());
        let item_id = seed_item(&db, "Pizza", 100.0).await;

        let line = make_line(ProductRef::MenuItem(item_id), "Pizza", 100.0, 1);
        let order = repo
            .create_with_lines(
                Some("guest:g1".into()),
                None,
                vec![line],
                &[None],
                make_address(),
                make_totals(100.0),
                None,
            )
            .await
            .unwrap();
        let order_id = order.id.unwrap();

        repo.set_payment_intent(&order_id, "pi_1").await.unwrap();
        let paid = repo.set_payment_state(&order_id, PaymentState::Paid).await.unwrap();
        assert_eq!(paid.payment_state, PaymentState::Paid);
        // 重复标记已支付是空操作
        let paid_again = repo.set_payment_state(&order_id, PaymentState::Paid).await.unwrap();
        assert_eq!(paid_again.payment_state, PaymentState::Paid);

        let by_intent = repo.find_by_payment_intent("pi_1").await.unwrap().unwrap();
        assert_eq!(by_intent.id.as_deref(), Some(order_id.as_str()));
    }
}
