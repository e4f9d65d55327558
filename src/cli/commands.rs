use crate::app::{AppContext, NewsError, Result};
use crate::controller::{ListController, PageSource};
use crate::domain::{Article, Category, FetchResult, Source};

pub fn list_categories() {
    for category in Category::ALL {
        println!("{}", category);
    }
}

pub async fn list_sources(
    ctx: &AppContext,
    category: &str,
    search: Option<&str>,
    retries: u32,
) -> Result<()> {
    let category: Category = category.parse()?;
    let list = ctx.source_list(category.as_str());
    if let Some(keyword) = search {
        list.update_keyword(keyword);
    }

    load_first_page(&list, retries).await;

    let sources = match list.current_filtered_result() {
        FetchResult::Success(sources) => sources,
        FetchResult::Empty => {
            println!("No sources in {}", category);
            return Ok(());
        }
        FetchResult::Error(message) => return Err(NewsError::Other(message)),
        FetchResult::Loading => return Ok(()),
    };

    if sources.is_empty() {
        println!("No sources match '{}'", search.unwrap_or_default());
        return Ok(());
    }

    for source in &sources {
        println!("{}", format_source(source));
    }

    Ok(())
}

/// How `open` picks its article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleSelector {
    /// 1-based position in the (filtered) listing
    Number(usize),
    /// Prefix of the article id
    Id(String),
}

impl ArticleSelector {
    pub fn from_args(index: Option<usize>, id: Option<String>) -> Option<Self> {
        match (index, id) {
            (_, Some(id)) => Some(ArticleSelector::Id(id)),
            (Some(index), None) => Some(ArticleSelector::Number(index)),
            (None, None) => None,
        }
    }
}

pub async fn list_articles(
    ctx: &AppContext,
    source: &str,
    pages: u32,
    search: Option<&str>,
    retries: u32,
) -> Result<()> {
    let list = ctx.article_list(source);
    if let Some(keyword) = search {
        list.update_keyword(keyword);
    }
    load_pages(&list, pages, retries).await?;

    let articles = match list.current_filtered_result() {
        FetchResult::Success(articles) => articles,
        FetchResult::Empty => {
            println!("No articles from {}", source);
            return Ok(());
        }
        FetchResult::Error(message) => return Err(NewsError::Other(message)),
        FetchResult::Loading => return Ok(()),
    };

    if articles.is_empty() {
        println!("No articles match '{}'", search.unwrap_or_default());
        return Ok(());
    }

    for (i, article) in articles.iter().enumerate() {
        println!("{}", format_article(i + 1, article));
    }

    let total = list.current_result().items().len();
    if articles.len() != total {
        println!("\n{} of {} articles shown", articles.len(), total);
    }

    Ok(())
}

pub async fn open_article(
    ctx: &AppContext,
    source: &str,
    selector: &ArticleSelector,
    pages: u32,
    search: Option<&str>,
) -> Result<()> {
    let list = ctx.article_list(source);
    if let Some(keyword) = search {
        list.update_keyword(keyword);
    }
    load_pages(&list, pages, 0).await?;

    let filtered = list.current_filtered_result();
    let all = list.current_result();
    let article = select_article(filtered.items(), all.items(), selector)?;
    let url = article
        .url
        .as_deref()
        .ok_or_else(|| NewsError::Other(format!("'{}' has no link", article.display_title())))?;

    println!("{}", format_preview(article));
    println!("Opening {}", url);
    open::that(url)?;
    Ok(())
}

/// Load the first page and then up to `pages - 1` more, stopping at the end
/// of the list or at a page that keeps failing.
async fn load_pages<P: PageSource>(list: &ListController<P>, pages: u32, retries: u32) -> Result<()> {
    load_first_page(list, retries).await;
    if let FetchResult::Error(message) = list.current_result() {
        return Err(NewsError::Other(message));
    }

    for _ in 1..pages {
        let cursor = list.state().cursor();
        if cursor.is_last_page || !list.current_result().is_success() {
            break;
        }
        list.load_more();
        list.settled().await;

        if !recover_page(list, retries).await {
            break;
        }
    }

    Ok(())
}

/// Numbers index the filtered listing; ids are matched against everything
/// loaded.
fn select_article<'a>(
    filtered: &'a [Article],
    all: &'a [Article],
    selector: &ArticleSelector,
) -> Result<&'a Article> {
    match selector {
        ArticleSelector::Number(number) => number
            .checked_sub(1)
            .and_then(|i| filtered.get(i))
            .ok_or_else(|| NewsError::Other(format!("No article number {}", number))),
        ArticleSelector::Id(prefix) => {
            let mut found = all.iter().filter(|a| a.matches_key(prefix));
            match (found.next(), found.next()) {
                (Some(article), None) => Ok(article),
                (Some(_), Some(_)) => Err(NewsError::Other(format!(
                    "Article id '{}' is ambiguous, give more characters",
                    prefix
                ))),
                (None, _) => Err(NewsError::Other(format!("No article with id '{}'", prefix))),
            }
        }
    }
}

/// Wait for the first page, retrying a failed load up to `retries` times.
async fn load_first_page<P: PageSource>(list: &ListController<P>, retries: u32) {
    let mut attempts = 0;
    loop {
        list.settled().await;
        let result = list.current_result();
        let Some(message) = result.error_message() else {
            return;
        };
        if attempts >= retries {
            return;
        }
        attempts += 1;
        eprintln!("  ! {} (retry {}/{})", message, attempts, retries);
        list.retry_initial_load();
    }
}

/// Retry a failed page until it loads or the retries run out. Returns false
/// when the page was given up on.
async fn recover_page<P: PageSource>(list: &ListController<P>, retries: u32) -> bool {
    let mut attempts = 0;
    while let Some(message) = list.pagination_error() {
        if attempts >= retries {
            eprintln!("  ! {}, showing what loaded so far", message);
            list.dismiss_pagination_error();
            list.settled().await;
            return false;
        }
        attempts += 1;
        eprintln!("  ! {} (retry {}/{})", message, attempts, retries);
        list.retry_pagination();
        list.settled().await;
    }
    true
}

fn format_source(source: &Source) -> String {
    let mut line = source.display_name().to_string();
    if let Some(id) = &source.id {
        line.push_str(&format!(" [{}]", id));
    }
    if let Some(description) = &source.description {
        line.push_str(&format!("\n  {}", description));
    }
    line
}

fn format_article(number: usize, article: &Article) -> String {
    let date = article
        .published_at_utc()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "          ".to_string());

    let mut line = format!(
        "{:>3}. {} {} [{}]",
        number,
        date,
        article.display_title(),
        article.short_key()
    );
    if let Some(author) = &article.author {
        line.push_str(&format!("\n     by {}", author));
    }
    line
}

fn format_preview(article: &Article) -> String {
    let mut preview = article.display_title().to_string();

    let byline: Vec<&str> = [article.source_name(), article.author.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !byline.is_empty() {
        preview.push_str(&format!("\n{}", byline.join(" / ")));
    }

    let content = article.display_content();
    if !content.is_empty() {
        preview.push_str(&format!("\n\n{}\n", content));
    }
    preview
}
