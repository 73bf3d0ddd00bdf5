use async_trait::async_trait;

use tokio_postgres::Row;

use crate::error::*;
use crate::models::*;

use crate::db::*;
use crate::db::user::{profile_from_row, PROFILE_COLUMNS};
use crate::db::util::*;

#[derive(Clone)]
pub struct CommentService {
  // get comment
  comment_by_id: VersionedStatement,

  // store comment
  store_comment: VersionedStatement,

  // delete comment
  delete_comment: VersionedStatement,

  // get multiple comments
  comments_by_article: VersionedStatement,
}

lazy_static! {
  static ref COMMENT_DETAILS_SELECT: String = format!(r#"
SELECT c.id, c.article_id, c.body, c.created_at, c.updated_at,
  {}
FROM comments c INNER JOIN users u ON c.author_id = u.id
"#, PROFILE_COLUMNS);
}

fn comment_details_from_row(row: &Row) -> CommentDetails {
  CommentDetails {
    id: row.get(0),
    article_id: row.get(1),
    body: row.get(2),
    created_at: row.get(3),
    updated_at: row.get(4),
    author: profile_from_row(row, 5),
  }
}

impl CommentService {
  pub fn new(cl: SharedClient) -> Result<CommentService> {
    // Build get_comment_* queries
    let comment_by_id = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE c.id = $2"#, *COMMENT_DETAILS_SELECT))?;

    // insert and re-read with the author in one round trip.
    let store_comment = VersionedStatement::new(cl.clone(),
        &format!(r#"WITH c AS (
          INSERT INTO comments(article_id, author_id, body)
          VALUES($2, $1, $3) RETURNING *
        )
        SELECT c.id, c.article_id, c.body, c.created_at, c.updated_at,
          {}
        FROM c INNER JOIN users u ON c.author_id = u.id"#, PROFILE_COLUMNS))?;

    // delete comment query
    let delete_comment = VersionedStatement::new(cl.clone(),
        r#"DELETE FROM comments WHERE id = $1 AND author_id = $2"#)?;

    // Build get_comments_* queries
    let comments_by_article = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE c.article_id = $2
          ORDER BY c.created_at DESC, c.id DESC"#, *COMMENT_DETAILS_SELECT))?;

    Ok(CommentService {
      comment_by_id,

      store_comment,
      delete_comment,

      comments_by_article,
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.comment_by_id.prepare().await?;

    self.store_comment.prepare().await?;
    self.delete_comment.prepare().await?;

    self.comments_by_article.prepare().await?;

    Ok(())
  }
}

#[async_trait(?Send)]
impl CommentStore for CommentService {
  async fn create(&self, article_id: i32, author_id: i32, body: &str) -> Result<CommentDetails> {
    let row = self.store_comment.query_one(&[&author_id, &article_id, &body]).await?;
    Ok(comment_details_from_row(&row))
  }

  async fn delete(&self, id: i32, author_id: i32) -> Result<bool> {
    Ok(self.delete_comment.execute(&[&id, &author_id]).await? > 0)
  }

  async fn get_by_id(&self, viewer: Option<i32>, id: i32) -> Result<Option<CommentDetails>> {
    let row = self.comment_by_id.query_opt(&[&viewer, &id]).await?;
    Ok(opt_row(&row, comment_details_from_row))
  }

  async fn list_by_article(&self, viewer: Option<i32>, article_id: i32) -> Result<Vec<CommentDetails>> {
    let rows = self.comments_by_article.query(&[&viewer, &article_id]).await?;
    Ok(rows.iter().map(comment_details_from_row).collect())
  }
}
