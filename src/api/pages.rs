//! Server-rendered page
//!
//! Stateless rendering over the session and the staging lists. All
//! interpolated text goes through `html-escape`.

use std::fmt::Write;

use axum::{
    extract::{Query, State},
    response::Html,
};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use serde::Deserialize;

use crate::AppState;
use crate::auth::{DiscordUser, MaybeUser};
use crate::auth::discord::default_avatar_url;
use crate::staging::{ACCEPTED_EXTENSIONS, SAMPLE_DOWNLOADS, StagedFile, StagedLink};

/// Page tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Upload,
    Download,
}

impl Tab {
    /// Unknown values fall back to the upload tab
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("download") => Tab::Download,
            _ => Tab::Upload,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    tab: Option<String>,
}

/// Everything the page shows
pub struct PageView<'a> {
    pub tab: Tab,
    pub user: Option<&'a DiscordUser>,
    pub cdn_base_url: &'a str,
    pub files: &'a [StagedFile],
    pub links: &'a [StagedLink],
}

/// GET /
pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let files = state.staging.files().await;
    let links = state.staging.links().await;

    Html(render_page(&PageView {
        tab: Tab::from_query(query.tab.as_deref()),
        user: user.as_ref(),
        cdn_base_url: &state.config.discord.cdn_base_url,
        files: &files,
        links: &links,
    }))
}

// =============================================================================
// Rendering
// =============================================================================

/// Forwards an implicit-grant fragment to the callback route. `replace`
/// keeps the token-bearing URL out of history.
const FRAGMENT_FORWARDER: &str = r#"<script>
(function () {
  var fragment = window.location.hash.slice(1);
  if (new URLSearchParams(fragment).has('access_token')) {
    window.location.replace('/auth/discord/callback?' + fragment);
  }
})();
</script>"#;

pub fn render_page(view: &PageView<'_>) -> String {
    let mut html = String::with_capacity(8 * 1024);

    html.push_str(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>MS Solution</title>
"#,
    );
    html.push_str(FRAGMENT_FORWARDER);
    html.push_str("\n</head>\n<body>\n");

    render_header(&mut html, view);
    html.push_str("<main>\n");
    render_hero(&mut html);
    render_tabs(&mut html, view.tab);
    match view.tab {
        Tab::Upload => render_upload(&mut html, view),
        Tab::Download => render_downloads(&mut html),
    }
    render_video(&mut html);
    html.push_str("</main>\n");
    render_footer(&mut html);

    html.push_str("</body>\n</html>\n");
    html
}

fn render_header(html: &mut String, view: &PageView<'_>) {
    html.push_str(
        r##"<header>
<div class="brand">MS Solution</div>
<nav>
<a href="#">Products</a>
<a href="#">Reviews</a>
<a href="#">Terms</a>
<a href="#">Privacy</a>
<a href="#">About</a>
</nav>
<div class="account">
"##,
    );

    match view.user {
        Some(user) => {
            let fallback = default_avatar_url(view.cdn_base_url);
            let _ = write!(
                html,
                r#"<div class="user-badge">
<img class="avatar" src="{src}" alt="Avatar" onerror="this.onerror=null;this.src='{fallback}'">
<span class="username">{name}</span>
</div>
<form method="post" action="/logout"><button type="submit" title="Logout">Logout</button></form>
"#,
                src = attr(&user.avatar_url(view.cdn_base_url)),
                fallback = attr(&fallback),
                name = text(user.display_name()),
            );
        }
        None => {
            html.push_str(r#"<a class="login" href="/auth/discord">Discord Login</a>"#);
            html.push('\n');
        }
    }

    html.push_str("<span class=\"cart\">0</span>\n</div>\n</header>\n");
}

fn render_hero(html: &mut String) {
    html.push_str(
        r##"<section class="hero">
<h1>MS Solution</h1>
<p>Discord.gg/sln</p>
<div class="stats"><span>18 products sold</span><span>5/5 rated (2 reviews)</span></div>
<a class="cta" href="#">View products</a>
</section>
"##,
    );
}

fn render_tabs(html: &mut String, active: Tab) {
    let class = |tab: Tab| if tab == active { "tab active" } else { "tab" };
    let _ = write!(
        html,
        r#"<div class="tabs">
<a class="{}" href="/?tab=upload">Upload Files &amp; Links</a>
<a class="{}" href="/?tab=download">Download Files</a>
</div>
"#,
        class(Tab::Upload),
        class(Tab::Download),
    );
}

fn render_upload(html: &mut String, view: &PageView<'_>) {
    html.push_str("<section class=\"panel upload\">\n<h2>Upload Files &amp; Links</h2>\n");

    if view.user.is_none() {
        html.push_str(
            r#"<div class="login-prompt">
<p>You need to log in with Discord to upload files and links.</p>
<a class="login" href="/auth/discord">Login with Discord</a>
</div>
</section>
"#,
        );
        return;
    }

    // Files
    let _ = write!(
        html,
        r#"<div class="card files">
<h3>Upload Files</h3>
<form method="post" action="/files" enctype="multipart/form-data">
<input type="file" name="files" multiple accept="{accept}">
<button type="submit">Select Files</button>
</form>
<h4>Uploaded Files ({count})</h4>
"#,
        accept = attr(&ACCEPTED_EXTENSIONS.join(",")),
        count = view.files.len(),
    );
    if view.files.is_empty() {
        html.push_str("<p class=\"empty\">No files uploaded yet</p>\n");
    } else {
        html.push_str("<ul>\n");
        for file in view.files {
            let _ = writeln!(
                html,
                r#"<li><span class="name">{name}</span><form method="post" action="/files/{id}/remove"><button type="submit">&times;</button></form></li>"#,
                name = text(&file.name),
                id = file.id,
            );
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</div>\n");

    // Links
    let _ = write!(
        html,
        r#"<div class="card links">
<h3>Add Links</h3>
<form method="post" action="/links">
<input type="url" name="url" placeholder="https://example.com" required>
<button type="submit">Add Link</button>
</form>
<h4>Saved Links ({count})</h4>
"#,
        count = view.links.len(),
    );
    if view.links.is_empty() {
        html.push_str("<p class=\"empty\">No links added yet</p>\n");
    } else {
        html.push_str("<ul>\n");
        for link in view.links {
            let _ = writeln!(
                html,
                r#"<li><a href="{href}" target="_blank" rel="noopener noreferrer">{label}</a><form method="post" action="/links/{id}/remove"><button type="submit">&times;</button></form></li>"#,
                href = attr(&link.url),
                label = text(&link.url),
                id = link.id,
            );
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</div>\n</section>\n");
}

fn render_downloads(html: &mut String) {
    html.push_str(
        "<section class=\"panel download\">\n<h2>Download Files</h2>\n<h3>Available Files</h3>\n<ul>\n",
    );
    for item in SAMPLE_DOWNLOADS {
        let _ = writeln!(
            html,
            r#"<li><h4>{name}</h4><span class="size">{size}</span><span class="count">{downloads} downloads</span><button type="button" disabled>Download</button></li>"#,
            name = text(item.name),
            size = text(item.size),
            downloads = item.downloads,
        );
    }
    html.push_str("</ul>\n</section>\n");
}

fn render_video(html: &mut String) {
    html.push_str(
        r#"<section class="video">
<h2>Featured Video</h2>
<iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ" title="Featured Video" allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture" allowfullscreen></iframe>
</section>
"#,
    );
}

fn render_footer(html: &mut String) {
    html.push_str(
        r##"<footer>
<div><h3>MS Solution</h3><p>Providing high-quality file hosting and sharing services since 2023.</p></div>
<div><h3>Quick Links</h3><ul><li><a href="#">Home</a></li><li><a href="#">Products</a></li><li><a href="#">Reviews</a></li><li><a href="#">Contact</a></li></ul></div>
<div><h3>Connect With Us</h3><p>Discord: Discord.gg/sln</p><p>Email: contact@mssolution.com</p></div>
<p class="copyright">&copy; 2025 MS Solution. All rights reserved.</p>
</footer>
"##,
    );
}
