//! Server-rendered HTML. Every user-supplied string goes through [`escape`].

use crate::leaderboard::CollegeFilter;
use crate::score::RankedRow;
use crate::session::Identity;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, identity: Option<&Identity>, body: &str) -> String {
    let nav = match identity {
        Some(id) => format!(
            r#"<nav><a href="/main">Test</a> <a href="/leaderboard">Leaderboard</a> <a href="/about">About</a> <a href="/contact">Contact</a> <span class="user">{}</span> <a href="/logout">Log out</a></nav>"#,
            escape(&id.username)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · typeboard</title>
</head>
<body>
{nav}
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

pub fn login(error: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Typing test</h1>
{error}
<form method="post" action="/login">
<label>Email <input type="email" name="email" required></label>
<label>SAP ID <input type="text" name="sap-id" required></label>
<label>Display name <input type="text" name="name" maxlength="30"></label>
<label>College <input type="text" name="college"></label>
<button type="submit">Start</button>
</form>"#
    );
    layout("Log in", None, &body)
}

const TYPING_SCRIPT: &str = r#"<script>
const passage = document.getElementById('passage').textContent.trim();
const input = document.getElementById('input');
const status = document.getElementById('status');
const seconds = 60;
let startedAt = null;
let done = false;

function finish() {
  if (done) return;
  done = true;
  input.disabled = true;
  const typed = input.value;
  let correct = 0;
  for (let i = 0; i < typed.length; i++) {
    if (typed[i] === passage[i]) correct++;
  }
  const minutes = (Date.now() - startedAt) / 60000;
  const wpm = Math.round((correct / 5) / minutes) || 0;
  const accuracy = typed.length > 0 ? Math.round((correct / typed.length) * 100) : 100;
  status.textContent = wpm + ' WPM, ' + accuracy + '% accuracy';
  fetch('/submit_result', {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify({wpm: wpm, accuracy: accuracy, duration_seconds: seconds})
  })
    .then(r => r.json())
    .then(d => { if (d.success) { window.location = d.redirect; } else { status.textContent += ' (' + d.error + ')'; } });
}

input.addEventListener('input', () => {
  if (startedAt === null) {
    startedAt = Date.now();
    setTimeout(finish, seconds * 1000);
  }
  if (input.value.length >= passage.length) finish();
});
</script>"#;

const PASSAGE: &str = "The quick brown fox jumps over the lazy dog while the early bird catches the worm and every good boy does fine on a sunny afternoon in the quiet park near the old library where students gather to read and write and practice typing as fast as they can";

pub fn main(identity: &Identity) -> String {
    let body = format!(
        r#"<h1>Hi {name}</h1>
<p>Type the passage below. The timer starts on your first keystroke and runs for 60 seconds.</p>
<p id="passage">{PASSAGE}</p>
<textarea id="input" rows="6" cols="80" autofocus></textarea>
<p id="status"></p>
{TYPING_SCRIPT}"#,
        name = escape(&identity.username),
    );
    layout("Typing test", Some(identity), &body)
}

pub fn about(identity: &Identity) -> String {
    layout(
        "About",
        Some(identity),
        "<h1>About</h1>\n<p>A one-minute typing test. Your best speed across all attempts is ranked on the leaderboard; accuracy is averaged over every attempt.</p>",
    )
}

pub fn contact(identity: &Identity) -> String {
    layout(
        "Contact",
        Some(identity),
        "<h1>Contact</h1>\n<p>Report an inappropriate username to the event organisers and it will be removed from the leaderboard.</p>",
    )
}

pub fn leaderboard(
    identity: &Identity,
    rows: &[RankedRow],
    colleges: &[String],
    filter: &CollegeFilter,
    error: Option<&str>,
) -> String {
    let mut body = String::from("<h1>Leaderboard</h1>\n");

    body.push_str(r#"<form method="get" action="/leaderboard"><select name="college" onchange="this.form.submit()">"#);
    let all_selected = if *filter == CollegeFilter::All { " selected" } else { "" };
    body.push_str(&format!(
        r#"<option value="all"{all_selected}>All colleges</option>"#
    ));
    for college in colleges {
        let selected = if filter.matches(college) && *filter != CollegeFilter::All {
            " selected"
        } else {
            ""
        };
        let college = escape(college);
        body.push_str(&format!(
            r#"<option value="{college}"{selected}>{college}</option>"#
        ));
    }
    body.push_str("</select></form>\n");

    if let Some(error) = error {
        body.push_str(&format!("<p class=\"error\">{}</p>\n", escape(error)));
    }

    if rows.is_empty() {
        body.push_str("<p>No results yet.</p>");
        return layout("Leaderboard", Some(identity), &body);
    }

    body.push_str("<table>\n<thead><tr><th>#</th><th>User</th><th>College</th><th>Best WPM</th><th>Avg accuracy</th><th>Tests</th></tr></thead>\n<tbody>\n");
    for ranked in rows {
        let row = &ranked.row;
        let me = if row.username == identity.username { r#" class="me""# } else { "" };
        body.push_str(&format!(
            "<tr{me}><td>{}</td><td>{}</td><td>{}</td><td>{:.0}</td><td>{:.1}%</td><td>{}</td></tr>\n",
            ranked.rank,
            escape(&row.username),
            escape(&row.college),
            row.best_wpm,
            row.avg_accuracy,
            row.tests_taken,
        ));
    }
    body.push_str("</tbody>\n</table>");

    layout("Leaderboard", Some(identity), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::LeaderboardRow;

    fn identity() -> Identity {
        Identity {
            email: "me@x.y".into(),
            sap_id: "1".into(),
            username: "me_typer".into(),
            college: None,
        }
    }

    #[test]
    fn escape_html_specials() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn login_shows_escaped_error() {
        let html = login(Some("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(r#"name="sap-id""#));
    }

    #[test]
    fn leaderboard_lists_rows_and_escapes_college() {
        let rows = vec![RankedRow {
            rank: 1,
            row: LeaderboardRow {
                username: "me_typer".into(),
                college: "A&B".into(),
                best_wpm: 88.0,
                avg_accuracy: 93.25,
                tests_taken: 4,
            },
        }];
        let html = leaderboard(&identity(), &rows, &["A&B".into()], &CollegeFilter::All, None);
        assert!(html.contains("<td>A&amp;B</td>"));
        assert!(html.contains("<td>88</td>"));
        assert!(html.contains("93.2%") || html.contains("93.3%"));
        assert!(html.contains(r#"class="me""#));
    }

    #[test]
    fn leaderboard_error_and_rows_on_separate_lines() {
        let rows = vec![RankedRow {
            rank: 1,
            row: LeaderboardRow {
                username: "x<y".into(),
                college: "Unknown".into(),
                best_wpm: 40.0,
                avg_accuracy: 90.0,
                tests_taken: 1,
            },
        }];
        let html = leaderboard(&identity(), &rows, &[], &CollegeFilter::All, Some("database is locked"));
        assert!(html.contains("<p class=\"error\">database is locked</p>\n"));
        assert!(html.contains("<td>x&lt;y</td>"));
        assert!(html.contains("</tr>\n</tbody>"));
        assert!(html.contains(r#"<option value="all" selected>All colleges</option>"#));
    }

    #[test]
    fn empty_leaderboard_says_so() {
        let html = leaderboard(&identity(), &[], &[], &CollegeFilter::All, None);
        assert!(html.contains("No results yet."));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn selected_college_is_marked() {
        let filter = CollegeFilter::parse(Some("nmims"));
        let html = leaderboard(&identity(), &[], &["NMIMS".into()], &filter, None);
        assert!(html.contains(r#"<option value="NMIMS" selected>"#));
    }
}
