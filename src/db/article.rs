use log::*;

use async_trait::async_trait;

use tokio_postgres::Row;

use crate::error::*;
use crate::models::*;

use crate::db::*;
use crate::db::user::{profile_from_row, PROFILE_COLUMNS};
use crate::db::util::*;

// Attempts at picking a free slug when a concurrent insert takes it first.
const SLUG_RETRIES: usize = 3;

#[derive(Clone)]
pub struct ArticleService {
  // get one article
  article_by_slug: VersionedStatement,
  article_owner: VersionedStatement,
  taken_slugs: VersionedStatement,

  // store article + tag set
  store_article: VersionedStatement,

  // update article, optionally replacing its tag set
  update_article: VersionedStatement,

  // delete article
  delete_article: VersionedStatement,

  // get multiple articles
  get_articles: VersionedStatement,
  count_articles: VersionedStatement,

  // get user's feed
  get_feed: VersionedStatement,
  count_feed: VersionedStatement,

  // (un)favorite article
  favorite_article: VersionedStatement,
  unfavorite_article: VersionedStatement,
  is_favorited: VersionedStatement,
  favorites_count: VersionedStatement,

  // tag catalog
  get_tags: VersionedStatement,
}

lazy_static! {
  static ref FAVORITE_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "favorites",
      columns: vec![
        column("user_id"),
        column("article_id"),
      ],
    }
  };

  static ref ARTICLE_DETAILS_SELECT: String = format!(r#"
SELECT a.id, a.slug, a.title, a.description, a.body, a.created_at, a.updated_at,
  ARRAY(SELECT t.name FROM article_tags at INNER JOIN tags t ON at.tag_id = t.id
    WHERE at.article_id = a.id ORDER BY t.name) AS tag_list,
  EXISTS(SELECT 1 FROM favorites WHERE article_id = a.id AND user_id = $1) AS favorited,
  (SELECT COUNT(*) FROM favorites WHERE article_id = a.id) AS favorites_count,
  {}
FROM articles a INNER JOIN users u ON a.author_id = u.id
"#, PROFILE_COLUMNS);
}

fn article_details_from_row(row: &Row) -> ArticleDetails {
  ArticleDetails {
    id: row.get(0),
    slug: row.get(1),
    title: row.get(2),
    description: row.get(3),
    body: row.get(4),
    created_at: row.get(5),
    updated_at: row.get(6),
    tag_list: row.get(7),
    favorited: row.get(8),
    favorites_count: row.get(9),
    author: profile_from_row(row, 10),
  }
}

/// Optional tag/author/favorited-by filters starting at parameter `$first`.
fn filter_where(first: usize) -> String {
  format!(r#"
WHERE (${tag}::text IS NULL OR EXISTS(
    SELECT 1 FROM article_tags at INNER JOIN tags t ON at.tag_id = t.id
    WHERE at.article_id = a.id AND t.name = ${tag}))
  AND (${author}::text IS NULL OR a.author_id = (SELECT id FROM users WHERE username = ${author}))
  AND (${fav}::text IS NULL OR EXISTS(
    SELECT 1 FROM favorites f INNER JOIN users fu ON f.user_id = fu.id
    WHERE f.article_id = a.id AND fu.username = ${fav}))
"#, tag = first, author = first + 1, fav = first + 2)
}

static FEED_WHERE: &str = r#"
WHERE a.author_id IN (SELECT followed_id FROM follows WHERE follower_id = $1)
"#;

impl ArticleService {
  pub fn new(cl: SharedClient) -> Result<ArticleService> {
    // Build article_by_* queries
    let article_by_slug = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE a.slug = $2"#, *ARTICLE_DETAILS_SELECT))?;
    let article_owner = VersionedStatement::new(cl.clone(),
        r#"SELECT id, author_id, title FROM articles WHERE slug = $1"#)?;
    let taken_slugs = VersionedStatement::new(cl.clone(),
        r#"SELECT slug FROM articles
        WHERE (slug = $1 OR slug LIKE $1 || '-%') AND id <> $2"#)?;

    // article row and tag links in one statement.
    let store_article = VersionedStatement::new(cl.clone(),
        r#"WITH new_article AS (
          INSERT INTO articles(author_id, slug, title, description, body)
          VALUES($1, $2, $3, $4, $5) RETURNING id
        ), new_tags AS (
          INSERT INTO tags(name) SELECT UNNEST($6::text[])
          ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
          RETURNING id
        ), links AS (
          INSERT INTO article_tags(article_id, tag_id)
          SELECT new_article.id, new_tags.id FROM new_article, new_tags
        )
        SELECT id FROM new_article"#)?;

    // $8 = replace the tag set with $7.
    let update_article = VersionedStatement::new(cl.clone(),
        r#"WITH target AS (
          UPDATE articles SET slug = $3, title = $4, description = $5, body = $6,
            updated_at = now()
          WHERE slug = $1 AND author_id = $2 RETURNING id
        ), wanted AS (
          INSERT INTO tags(name) SELECT UNNEST($7::text[])
          WHERE $8 AND EXISTS(SELECT 1 FROM target)
          ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
          RETURNING id
        ), removed AS (
          DELETE FROM article_tags
          WHERE $8 AND article_id IN (SELECT id FROM target)
            AND tag_id NOT IN (SELECT id FROM wanted)
        ), added AS (
          INSERT INTO article_tags(article_id, tag_id)
          SELECT target.id, wanted.id FROM target, wanted
          ON CONFLICT DO NOTHING
        )
        SELECT id FROM target"#)?;

    // tags, favorites and comments cascade.
    let delete_article = VersionedStatement::new(cl.clone(),
        r#"DELETE FROM articles WHERE slug = $1 AND author_id = $2"#)?;

    // Build get_articles queries
    let get_articles = VersionedStatement::new(cl.clone(),
        &format!(r#"{} {} ORDER BY a.id DESC LIMIT $5 OFFSET $6"#,
        *ARTICLE_DETAILS_SELECT, filter_where(2)))?;
    let count_articles = VersionedStatement::new(cl.clone(),
        &format!(r#"SELECT COUNT(*) FROM articles a {}"#, filter_where(1)))?;

    // Build get_feed queries
    let get_feed = VersionedStatement::new(cl.clone(),
        &format!(r#"{} {} ORDER BY a.id DESC LIMIT $2 OFFSET $3"#,
        *ARTICLE_DETAILS_SELECT, FEED_WHERE))?;
    let count_feed = VersionedStatement::new(cl.clone(),
        &format!(r#"SELECT COUNT(*) FROM articles a {}"#, FEED_WHERE))?;

    // (un)favorite
    let favorite_article = VersionedStatement::new(cl.clone(),
        &FAVORITE_COLUMNS.build_insert_ignore())?;
    let unfavorite_article = VersionedStatement::new(cl.clone(),
        &FAVORITE_COLUMNS.build_delete_query())?;
    let is_favorited = VersionedStatement::new(cl.clone(),
        &FAVORITE_COLUMNS.build_exists_query())?;
    let favorites_count = VersionedStatement::new(cl.clone(),
        r#"SELECT COUNT(*) FROM favorites WHERE article_id = $1"#)?;

    let get_tags = VersionedStatement::new(cl.clone(),
        r#"SELECT t.name FROM tags t LEFT JOIN article_tags at ON at.tag_id = t.id
        GROUP BY t.id, t.name
        HAVING COUNT(at.article_id) >= $1
        ORDER BY COUNT(at.article_id) DESC, t.name ASC"#)?;

    Ok(ArticleService {
      article_by_slug,
      article_owner,
      taken_slugs,

      store_article,
      update_article,
      delete_article,

      get_articles,
      count_articles,
      get_feed,
      count_feed,

      favorite_article,
      unfavorite_article,
      is_favorited,
      favorites_count,

      get_tags,
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.article_by_slug.prepare().await?;
    self.article_owner.prepare().await?;
    self.taken_slugs.prepare().await?;

    self.store_article.prepare().await?;
    self.update_article.prepare().await?;
    self.delete_article.prepare().await?;

    self.get_articles.prepare().await?;
    self.count_articles.prepare().await?;
    self.get_feed.prepare().await?;
    self.count_feed.prepare().await?;

    self.favorite_article.prepare().await?;
    self.unfavorite_article.prepare().await?;
    self.is_favorited.prepare().await?;
    self.favorites_count.prepare().await?;

    self.get_tags.prepare().await?;
    Ok(())
  }

  /// Free slug for `title`, ignoring the article `own_id`.
  async fn free_slug(&self, title: &str, own_id: i32) -> Result<String> {
    let base = slug_for_title(title);
    let rows = self.taken_slugs.query(&[&base, &own_id]).await?;
    let taken: Vec<String> = rows.iter().map(|row| row.get(0)).collect();
    Ok(next_free_slug(&base, |slug| taken.iter().any(|t| t == slug)))
  }
}

#[async_trait(?Send)]
impl ArticleStore for ArticleService {
  async fn create(&self, author_id: i32, article: &NewArticle) -> Result<String> {
    let tags = clean_tags(&article.tag_list);
    let mut attempt = 0;
    loop {
      attempt += 1;
      let slug = self.free_slug(&article.title, 0).await?;
      match self.store_article.query_one(&[
        &author_id, &slug, &article.title, &article.description, &article.body, &tags,
      ]).await {
        Ok(_) => return Ok(slug),
        Err(err) if err.is_conflict() && attempt < SLUG_RETRIES => {
          debug!("Article slug '{}' taken concurrently, retrying.", slug);
        },
        Err(err) => return Err(err),
      }
    }
  }

  async fn update(&self, slug: &str, author_id: i32, changes: &ArticleChanges) -> Result<Option<String>> {
    let (id, title) = match self.article_owner.query_opt(&[&slug]).await? {
      Some(row) if row.get::<_, i32>(1) == author_id => (row.get::<_, i32>(0), row.get::<_, String>(2)),
      _ => return Ok(None),
    };
    let replace_tags = changes.tag_list.is_some();
    let tags = clean_tags(changes.tag_list.as_deref().unwrap_or(&[]));
    let mut attempt = 0;
    loop {
      attempt += 1;
      let new_slug = if title != changes.title {
        self.free_slug(&changes.title, id).await?
      } else {
        slug.to_string()
      };
      match self.update_article.query_opt(&[
        &slug, &author_id, &new_slug, &changes.title, &changes.description, &changes.body,
        &tags, &replace_tags,
      ]).await {
        Ok(row) => return Ok(row.map(|_| new_slug)),
        Err(err) if err.is_conflict() && attempt < SLUG_RETRIES => {
          debug!("Article slug '{}' taken concurrently, retrying.", new_slug);
        },
        Err(err) => return Err(err),
      }
    }
  }

  async fn delete(&self, slug: &str, author_id: i32) -> Result<bool> {
    Ok(self.delete_article.execute(&[&slug, &author_id]).await? > 0)
  }

  async fn get_by_slug(&self, viewer: Option<i32>, slug: &str) -> Result<Option<ArticleDetails>> {
    let row = self.article_by_slug.query_opt(&[&viewer, &slug]).await?;
    Ok(opt_row(&row, article_details_from_row))
  }

  async fn list(&self, viewer: Option<i32>, filter: &ArticleFilter) -> Result<Page<ArticleDetails>> {
    let rows = self.get_articles.query(&[
      &viewer, &filter.tag, &filter.author, &filter.favorited_by, &filter.limit, &filter.offset,
    ]).await?;
    let total = self.count_articles.query_one(&[
      &filter.tag, &filter.author, &filter.favorited_by,
    ]).await?;
    Ok(Page {
      items: rows.iter().map(article_details_from_row).collect(),
      total: total.get(0),
    })
  }

  async fn feed(&self, user_id: i32, limit: i64, offset: i64) -> Result<Page<ArticleDetails>> {
    let viewer = Some(user_id);
    let rows = self.get_feed.query(&[&viewer, &limit, &offset]).await?;
    let total = self.count_feed.query_one(&[&viewer]).await?;
    Ok(Page {
      items: rows.iter().map(article_details_from_row).collect(),
      total: total.get(0),
    })
  }

  async fn favorite(&self, user_id: i32, article_id: i32) -> Result<()> {
    self.favorite_article.execute(&[&user_id, &article_id]).await?;
    Ok(())
  }

  async fn unfavorite(&self, user_id: i32, article_id: i32) -> Result<()> {
    self.unfavorite_article.execute(&[&user_id, &article_id]).await?;
    Ok(())
  }

  async fn is_favorited(&self, user_id: i32, article_id: i32) -> Result<bool> {
    let row = self.is_favorited.query_one(&[&user_id, &article_id]).await?;
    Ok(row.get(0))
  }

  async fn favorites_count(&self, article_id: i32) -> Result<i64> {
    let row = self.favorites_count.query_one(&[&article_id]).await?;
    Ok(row.get(0))
  }

  async fn tags(&self, min_count: i64) -> Result<Vec<String>> {
    let rows = self.get_tags.query(&[&min_count]).await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
  }
}
