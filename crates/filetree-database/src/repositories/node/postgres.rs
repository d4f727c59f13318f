//! PostgreSQL node repository.
//!
//! Every mutating transaction starts by locking the owner's root row with
//! `SELECT ... FOR UPDATE`. All writers for one owner therefore queue on
//! that row, which serializes index shifts per owner while leaving other
//! owners untouched. Shifts are single `UPDATE ... CASE` statements, so
//! no row is ever observed half-shifted.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use filetree_core::error::AppError;
use filetree_core::result::AppResult;
use filetree_core::types::id::{NodeId, OwnerId};
use filetree_core::types::pagination::{PageRequest, PageResponse};
use filetree_entity::node::nested_set::{ROOT_LFT, ROOT_RGT, insertion_slot};
use filetree_entity::node::{NewNode, Node, SiblingRule, SubtreePlan, path};

use super::NodeRepository;
use crate::error::db_error;

const LOCK_ROOT: &str =
    "SELECT * FROM nodes WHERE owner_id = $1 AND parent_id IS NULL FOR UPDATE";

const SHIFT_FOR_INSERT: &str = "UPDATE nodes SET \
     lft = CASE WHEN lft >= $2 THEN lft + $3 ELSE lft END, \
     rgt = CASE WHEN rgt >= $2 THEN rgt + $3 ELSE rgt END \
     WHERE owner_id = $1 AND rgt >= $2";

const SHIFT_FOR_DELETE: &str = "UPDATE nodes SET \
     lft = CASE WHEN lft > $2 THEN lft - $3 ELSE lft END, \
     rgt = rgt - $3 \
     WHERE owner_id = $1 AND rgt > $2";

const INSERT_NODE: &str = "INSERT INTO nodes \
     (id, owner_id, parent_id, name, is_folder, path, lft, rgt, \
      storage_path, mime, size_bytes, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12) RETURNING *";

/// Node repository backed by the `nodes` table.
#[derive(Debug, Clone)]
pub struct PgNodeRepository {
    pool: PgPool,
}

impl PgNodeRepository {
    /// Create a new node repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A row about to be written inside an open transaction.
struct RowInsert<'a> {
    id: NodeId,
    owner_id: OwnerId,
    parent_id: NodeId,
    node: &'a NewNode,
    path: &'a str,
    lft: i64,
    rgt: i64,
    now: DateTime<Utc>,
}

async fn lock_root(conn: &mut PgConnection, owner_id: OwnerId) -> AppResult<Node> {
    sqlx::query_as::<_, Node>(LOCK_ROOT)
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to lock owner tree", e))?
        .ok_or_else(|| AppError::not_found(format!("Owner {owner_id} has no tree")))
}

async fn fetch_folder(conn: &mut PgConnection, owner_id: OwnerId, id: NodeId) -> AppResult<Node> {
    let node = sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to load parent node", e))?
        .ok_or_else(|| AppError::not_found(format!("Node {id} not found")))?;
    if !node.is_folder {
        return Err(AppError::invalid_input(format!(
            "'{}' is a file and cannot hold children",
            node.name
        )));
    }
    Ok(node)
}

async fn check_sibling_name(
    conn: &mut PgConnection,
    owner_id: OwnerId,
    parent_id: NodeId,
    node: &NewNode,
) -> AppResult<()> {
    if node.sibling_rule == SiblingRule::Allow {
        return Ok(());
    }
    let siblings: Vec<bool> = sqlx::query_scalar(
        "SELECT is_folder FROM nodes WHERE owner_id = $1 AND parent_id = $2 AND name = $3",
    )
    .bind(owner_id)
    .bind(parent_id)
    .bind(&node.name)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to check sibling names", e))?;
    if siblings.into_iter().any(|is_folder| node.sibling_rule.blocked_by(is_folder)) {
        return Err(node.name_taken());
    }
    Ok(())
}

async fn claim_path(conn: &mut PgConnection, owner_id: OwnerId, base: &str) -> AppResult<String> {
    let taken: Vec<String> = sqlx::query_scalar(
        "SELECT path FROM nodes WHERE owner_id = $1 AND parent_id IS NOT NULL \
         AND (path = $2 OR path LIKE $3)",
    )
    .bind(owner_id)
    .bind(base)
    .bind(path::suffix_like_pattern(base))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to check path collisions", e))?;
    let taken: HashSet<String> = taken.into_iter().collect();
    Ok(path::unique_path(base, |candidate| taken.contains(candidate)))
}

async fn open_gap(conn: &mut PgConnection, owner_id: OwnerId, at: i64, width: i64) -> AppResult<()> {
    let shifted = sqlx::query(SHIFT_FOR_INSERT)
        .bind(owner_id)
        .bind(at)
        .bind(width)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to shift nested-set indices", e))?;
    debug!(%owner_id, at, width, rows = shifted.rows_affected(), "Opened index gap");
    Ok(())
}

async fn insert_row(conn: &mut PgConnection, row: RowInsert<'_>) -> AppResult<Node> {
    sqlx::query_as::<_, Node>(INSERT_NODE)
        .bind(row.id)
        .bind(row.owner_id)
        .bind(row.parent_id)
        .bind(&row.node.name)
        .bind(row.node.is_folder)
        .bind(row.path)
        .bind(row.lft)
        .bind(row.rgt)
        .bind(&row.node.storage_path)
        .bind(&row.node.mime)
        .bind(row.node.size_bytes)
        .bind(row.now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to insert node", e))
}

#[async_trait]
impl NodeRepository for PgNodeRepository {
    fn backend_name(&self) -> &str {
        "postgres"
    }

    /// Healthy once the server answers and the `nodes` table exists.
    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT to_regclass('nodes') IS NOT NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Health check failed", e))
    }

    async fn resolve_root(&self, owner_id: OwnerId) -> AppResult<Node> {
        let now = Utc::now();
        let created = sqlx::query(
            "INSERT INTO nodes (id, owner_id, parent_id, name, is_folder, path, lft, rgt, \
             created_at, updated_at) \
             VALUES ($1, $2, NULL, $3, TRUE, '', $4, $5, $6, $6) \
             ON CONFLICT (owner_id) WHERE parent_id IS NULL DO NOTHING",
        )
        .bind(NodeId::new())
        .bind(owner_id)
        .bind(owner_id.to_string())
        .bind(ROOT_LFT)
        .bind(ROOT_RGT)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create root node", e))?;
        if created.rows_affected() > 0 {
            debug!(%owner_id, "Created root node");
        }

        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE owner_id = $1 AND parent_id IS NULL")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load root node", e))
    }

    async fn find_by_id(&self, owner_id: OwnerId, id: NodeId) -> AppResult<Option<Node>> {
        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find node", e))
    }

    async fn find_by_path(&self, owner_id: OwnerId, path: &str) -> AppResult<Option<Node>> {
        sqlx::query_as::<_, Node>(
            "SELECT * FROM nodes WHERE owner_id = $1 AND path = $2 AND parent_id IS NOT NULL",
        )
        .bind(owner_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find node by path", e))
    }

    async fn list_children(
        &self,
        owner_id: OwnerId,
        parent_id: NodeId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Node>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM nodes WHERE owner_id = $1 AND parent_id = $2")
                .bind(owner_id)
                .bind(parent_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("Failed to count children", e))?;

        let nodes = sqlx::query_as::<_, Node>(
            "SELECT * FROM nodes WHERE owner_id = $1 AND parent_id = $2 \
             ORDER BY is_folder DESC, created_at DESC, lft DESC LIMIT $3 OFFSET $4",
        )
        .bind(owner_id)
        .bind(parent_id)
        .bind(i64::try_from(page.limit()).unwrap_or(i64::MAX))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list children", e))?;

        Ok(PageResponse::new(
            nodes,
            page.page,
            page.page_size,
            total as u64,
        ))
    }

    async fn children(&self, owner_id: OwnerId, parent_id: NodeId) -> AppResult<Vec<Node>> {
        sqlx::query_as::<_, Node>(
            "SELECT * FROM nodes WHERE owner_id = $1 AND parent_id = $2 ORDER BY lft ASC",
        )
        .bind(owner_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load children", e))
    }

    async fn ancestors(&self, node: &Node) -> AppResult<Vec<Node>> {
        // Reads the target's current interval rather than the caller's copy,
        // which may predate a concurrent shift.
        sqlx::query_as::<_, Node>(
            "SELECT a.* FROM nodes a JOIN nodes t ON t.id = $2 \
             WHERE a.owner_id = $1 AND t.owner_id = $1 AND a.lft < t.lft AND a.rgt > t.rgt \
             ORDER BY (a.rgt - a.lft) DESC",
        )
        .bind(node.owner_id)
        .bind(node.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load ancestors", e))
    }

    async fn subtree(&self, node: &Node) -> AppResult<Vec<Node>> {
        sqlx::query_as::<_, Node>(
            "SELECT d.* FROM nodes d JOIN nodes t ON t.id = $2 \
             WHERE d.owner_id = $1 AND t.owner_id = $1 AND d.lft >= t.lft AND d.rgt <= t.rgt \
             ORDER BY d.lft ASC",
        )
        .bind(node.owner_id)
        .bind(node.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load subtree", e))
    }

    async fn all_nodes(&self, owner_id: OwnerId) -> AppResult<Vec<Node>> {
        sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE owner_id = $1 ORDER BY lft ASC")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load owner tree", e))
    }

    async fn count(&self, owner_id: OwnerId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nodes WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count nodes", e))?;
        Ok(count as u64)
    }

    async fn insert_child(
        &self,
        owner_id: OwnerId,
        parent_id: NodeId,
        node: NewNode,
    ) -> AppResult<Node> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        lock_root(&mut tx, owner_id).await?;
        let parent = fetch_folder(&mut tx, owner_id, parent_id).await?;
        check_sibling_name(&mut tx, owner_id, parent_id, &node).await?;
        let path = claim_path(&mut tx, owner_id, &path::child_path(&parent, &node.name)).await?;
        let (lft, rgt) = insertion_slot(parent.rgt);

        open_gap(&mut tx, owner_id, parent.rgt, 2).await?;
        let inserted = insert_row(
            &mut tx,
            RowInsert {
                id: NodeId::new(),
                owner_id,
                parent_id,
                node: &node,
                path: &path,
                lft,
                rgt,
                now: Utc::now(),
            },
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit insert", e))?;
        Ok(inserted)
    }

    async fn insert_subtree(
        &self,
        owner_id: OwnerId,
        parent_id: NodeId,
        plan: &SubtreePlan,
    ) -> AppResult<Vec<Node>> {
        if plan.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        lock_root(&mut tx, owner_id).await?;
        let parent = fetch_folder(&mut tx, owner_id, parent_id).await?;
        for planned in plan.nodes().iter().filter(|p| p.parent.is_none()) {
            check_sibling_name(&mut tx, owner_id, parent_id, &planned.node).await?;
        }
        let base = parent.rgt;
        open_gap(&mut tx, owner_id, base, plan.width()).await?;

        let now = Utc::now();
        let mut created: Vec<Node> = Vec::with_capacity(plan.len());
        for planned in plan.nodes() {
            let under = match planned.parent {
                Some(index) => created.get(index).ok_or_else(|| {
                    AppError::internal(format!("Planned parent #{index} was not created first"))
                })?,
                None => &parent,
            };
            let base_path = path::child_path(under, &planned.node.name);
            let under_id = under.id;
            let path = claim_path(&mut tx, owner_id, &base_path).await?;
            let node = insert_row(
                &mut tx,
                RowInsert {
                    id: NodeId::new(),
                    owner_id,
                    parent_id: under_id,
                    node: &planned.node,
                    path: &path,
                    lft: base + planned.lft,
                    rgt: base + planned.rgt,
                    now,
                },
            )
            .await?;
            created.push(node);
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit subtree insert", e))?;
        debug!(%owner_id, %parent_id, nodes = created.len(), "Inserted subtree");
        Ok(created)
    }

    async fn delete_subtree(&self, owner_id: OwnerId, node_id: NodeId) -> AppResult<Vec<Node>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        lock_root(&mut tx, owner_id).await?;
        let target = sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = $1 AND owner_id = $2")
            .bind(node_id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to load node", e))?
            .ok_or_else(|| AppError::not_found(format!("Node {node_id} not found")))?;
        if target.is_root() {
            return Err(AppError::invalid_input("The root folder cannot be deleted"));
        }

        let mut removed = sqlx::query_as::<_, Node>(
            "DELETE FROM nodes WHERE owner_id = $1 AND lft >= $2 AND rgt <= $3 RETURNING *",
        )
        .bind(owner_id)
        .bind(target.lft)
        .bind(target.rgt)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to delete subtree", e))?;

        let shifted = sqlx::query(SHIFT_FOR_DELETE)
            .bind(owner_id)
            .bind(target.rgt)
            .bind(target.width())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to close nested-set gap", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit delete", e))?;

        debug!(
            %owner_id,
            %node_id,
            removed = removed.len(),
            shifted = shifted.rows_affected(),
            "Deleted subtree"
        );
        removed.sort_by_key(|n| n.lft);
        Ok(removed)
    }
}
