//! Template engine setup and HTML templates.

use once_cell::sync::Lazy;
use tera::{Context, Tera};

/// Global template engine instance with embedded templates.
pub static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();

    // Embed templates directly in the binary (no external files needed)
    if let Err(e) = tera.add_raw_templates(vec![
        ("base.html", BASE_TEMPLATE),
        ("questions.html", QUESTIONS_TEMPLATE),
        ("question.html", QUESTION_TEMPLATE),
        ("question_form.html", QUESTION_FORM_TEMPLATE),
        ("new_question.html", NEW_QUESTION_TEMPLATE),
        ("edit_question.html", EDIT_QUESTION_TEMPLATE),
        ("login.html", LOGIN_TEMPLATE),
        ("register.html", REGISTER_TEMPLATE),
        ("error.html", ERROR_TEMPLATE),
    ]) {
        tracing::error!("Failed to load templates: {:?}", e);
    }

    tera
});

/// Render a template with context
pub fn render(template: &str, context: &Context) -> Result<String, tera::Error> {
    TEMPLATES.render(template, context)
}

// =============================================================================
// Embedded Templates
// =============================================================================

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{% block title %}Q&amp;A{% endblock %}</title>
    <style>
        :root {
            --bg: #0a0a0a;
            --bg-secondary: #141414;
            --foreground: #fafafa;
            --foreground-secondary: rgba(250, 250, 250, 0.7);
            --foreground-tertiary: rgba(250, 250, 250, 0.4);
            --border: #262626;
            --border-subtle: #1a1a1a;
            --success: #4ade80;
            --danger: #f87171;
        }

        * { box-sizing: border-box; margin: 0; padding: 0; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--foreground);
            line-height: 1.6;
            -webkit-font-smoothing: antialiased;
        }

        a { color: var(--foreground); text-decoration: none; transition: opacity 0.15s; }
        a:hover { opacity: 0.7; }

        .header { border-bottom: 1px solid var(--border-subtle); padding: 20px 32px; }
        .header-content {
            max-width: 960px;
            margin: 0 auto;
            display: flex;
            align-items: center;
            justify-content: space-between;
        }
        .logo { font-size: 18px; font-weight: 600; letter-spacing: -0.02em; }
        .nav { display: flex; gap: 24px; align-items: center; }
        .nav a, .nav span { color: var(--foreground-secondary); font-size: 14px; }
        .nav form { display: inline; }

        .container { max-width: 960px; margin: 0 auto; padding: 48px 32px; }

        h1 { font-size: 28px; font-weight: 600; letter-spacing: -0.02em; margin-bottom: 24px; }
        h2 {
            font-size: 14px;
            font-weight: 500;
            color: var(--foreground-secondary);
            text-transform: uppercase;
            letter-spacing: 0.05em;
            margin-bottom: 16px;
        }

        .card { background: var(--bg-secondary); border: 1px solid var(--border); border-radius: 16px; overflow: hidden; }
        .card + .card { margin-top: 24px; }
        .card-body { padding: 24px; }

        .list { list-style: none; }
        .list-item { padding: 20px; border-bottom: 1px solid var(--border-subtle); display: flex; gap: 20px; }
        .list-item:last-child { border-bottom: none; }

        .counters { display: flex; flex-direction: column; gap: 8px; min-width: 84px; text-align: center; }
        .counter { font-size: 12px; color: var(--foreground-tertiary); padding: 6px 4px; border-radius: 8px; }
        .counter strong { display: block; font-size: 18px; color: var(--foreground-secondary); }
        .status.answered { border: 1px solid var(--success); }
        .status.answered strong { color: var(--success); }
        .status.answered-accepted { background: var(--success); color: var(--bg); }
        .status.answered-accepted strong { color: var(--bg); }

        .badge {
            font-size: 11px;
            font-weight: 500;
            padding: 4px 10px;
            border-radius: 100px;
            background: rgba(34, 197, 94, 0.15);
            color: var(--success);
            text-transform: uppercase;
        }

        .btn {
            display: inline-flex;
            align-items: center;
            padding: 8px 18px;
            border-radius: 100px;
            font-size: 14px;
            font-weight: 500;
            border: none;
            cursor: pointer;
            font-family: inherit;
        }
        .btn-primary { background: var(--foreground); color: var(--bg); }
        .btn-secondary { background: transparent; border: 1px solid var(--border); color: var(--foreground); }
        .btn-danger { background: transparent; border: 1px solid var(--danger); color: var(--danger); }
        .btn-sm { padding: 4px 12px; font-size: 12px; }
        .btn-link { background: none; border: none; color: var(--foreground-secondary); cursor: pointer; font: inherit; }

        .alert { padding: 14px 20px; border-radius: 12px; margin-bottom: 24px; font-size: 14px; }
        .alert-success { background: rgba(34, 197, 94, 0.12); color: var(--success); }
        .alert-error { background: rgba(248, 113, 113, 0.12); color: var(--danger); }

        .field { margin-bottom: 20px; }
        .field label { display: block; font-size: 13px; color: var(--foreground-secondary); margin-bottom: 6px; }
        .input {
            width: 100%;
            padding: 12px 16px;
            background: var(--bg);
            border: 1px solid var(--border);
            border-radius: 8px;
            color: var(--foreground);
            font-size: 14px;
            font-family: inherit;
        }
        textarea.input { min-height: 200px; resize: vertical; }
        .input.is-invalid { border-color: var(--danger); }
        .invalid-feedback { color: var(--danger); font-size: 13px; margin-top: 6px; }

        .meta { font-size: 13px; color: var(--foreground-tertiary); }
        .actions { display: flex; gap: 8px; align-items: center; margin-top: 12px; }
        .actions form { display: inline; }
        .body-text { color: var(--foreground-secondary); }

        .pagination { display: flex; justify-content: space-between; align-items: center; margin-top: 24px; }

        .empty { text-align: center; padding: 64px 32px; color: var(--foreground-tertiary); }

        .flex { display: flex; }
        .items-center { align-items: center; }
        .justify-between { justify-content: space-between; }
        .mt-4 { margin-top: 16px; }
        .mt-6 { margin-top: 24px; }
        .mb-4 { margin-bottom: 16px; }

        @media (max-width: 768px) {
            .header { padding: 16px 20px; }
            .container { padding: 32px 20px; }
            .list-item { flex-direction: column; }
            .counters { flex-direction: row; }
        }
    </style>
</head>
<body>
    <header class="header">
        <div class="header-content">
            <a href="/questions" class="logo">Q&amp;A</a>
            <nav class="nav">
                <a href="/questions">Questions</a>
                {% if current_user %}
                <a href="/questions/create">Ask Question</a>
                <span>{{ current_user }}</span>
                <form method="POST" action="/logout">
                    <input type="hidden" name="csrf_token" value="{{ csrf_token }}">
                    <button type="submit" class="btn-link">Logout</button>
                </form>
                {% else %}
                <a href="/login">Login</a>
                <a href="/register">Register</a>
                {% endif %}
            </nav>
        </div>
    </header>
    <main class="container">
        {% if success %}<div class="alert alert-success">{{ success }}</div>{% endif %}
        {% block content %}{% endblock %}
    </main>
</body>
</html>"##;

const QUESTIONS_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}All Questions - Q&amp;A{% endblock %}
{% block content %}
<div class="flex items-center justify-between mb-4">
    <h1 style="margin-bottom: 0;">All Questions</h1>
    <a href="/questions/create" class="btn btn-secondary">Ask Question</a>
</div>

<div class="card">
    {% if questions %}
    <ul class="list">
        {% for question in questions %}
        <li class="list-item">
            <div class="counters">
                <div class="counter"><strong>{{ question.votes }}</strong>{% if question.votes == 1 %}vote{% else %}votes{% endif %}</div>
                <div class="counter status {{ question.status }}"><strong>{{ question.answer_count }}</strong>{% if question.answer_count == 1 %}answer{% else %}answers{% endif %}</div>
                <div class="counter">{{ question.views }} {% if question.views == 1 %}view{% else %}views{% endif %}</div>
            </div>
            <div style="flex: 1;">
                <h3><a href="/questions/{{ question.slug }}">{{ question.title }}</a></h3>
                <p class="meta">Asked by {{ question.author }} {{ question.created }}</p>
                <p class="body-text mt-4">{{ question.excerpt }}</p>
                {% if question.can_update or question.can_delete %}
                <div class="actions">
                    {% if question.can_update %}
                    <a href="/questions/{{ question.id }}/edit" class="btn btn-secondary btn-sm">Edit</a>
                    {% endif %}
                    {% if question.can_delete %}
                    <form method="POST" action="/questions/{{ question.id }}" onsubmit="return confirm('Are you sure?')">
                        <input type="hidden" name="_method" value="DELETE">
                        <input type="hidden" name="csrf_token" value="{{ csrf_token }}">
                        <button type="submit" class="btn btn-danger btn-sm">Delete</button>
                    </form>
                    {% endif %}
                </div>
                {% endif %}
            </div>
        </li>
        {% endfor %}
    </ul>
    {% else %}
    <div class="empty">
        <p>There are no questions yet</p>
    </div>
    {% endif %}
</div>

{% if num_pages > 1 %}
<div class="pagination">
    {% if has_previous %}<a href="/questions?page={{ page - 1 }}" class="btn btn-secondary">Previous</a>{% else %}<span></span>{% endif %}
    <span class="meta">Page {{ page }} of {{ num_pages }}</span>
    {% if has_next %}<a href="/questions?page={{ page + 1 }}" class="btn btn-secondary">Next</a>{% else %}<span></span>{% endif %}
</div>
{% endif %}
{% endblock %}"##;

const QUESTION_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}{{ question.title }} - Q&amp;A{% endblock %}
{% block content %}
<div class="card">
    <div class="card-body">
        <div class="flex items-center justify-between">
            <h1 style="margin-bottom: 8px;">{{ question.title }}</h1>
            <a href="/questions" class="btn btn-secondary btn-sm">Back to all questions</a>
        </div>
        <p class="meta">Asked by {{ question.author }} {{ question.created }} &middot; {{ question.views }} views &middot; {{ question.votes }} votes</p>
        <div class="body-text mt-6">{{ question.body | escape | linebreaksbr | safe }}</div>
        {% if question.can_update or question.can_delete %}
        <div class="actions">
            {% if question.can_update %}
            <a href="/questions/{{ question.id }}/edit" class="btn btn-secondary btn-sm">Edit</a>
            {% endif %}
            {% if question.can_delete %}
            <form method="POST" action="/questions/{{ question.id }}" onsubmit="return confirm('Are you sure?')">
                <input type="hidden" name="_method" value="DELETE">
                <input type="hidden" name="csrf_token" value="{{ csrf_token }}">
                <button type="submit" class="btn btn-danger btn-sm">Delete</button>
            </form>
            {% endif %}
        </div>
        {% endif %}
    </div>
</div>

<h2 class="mt-6" id="answers">{{ question.answer_count }} {% if question.answer_count == 1 %}Answer{% else %}Answers{% endif %}</h2>
<div class="card">
    {% if answers %}
    <ul class="list">
        {% for answer in answers %}
        <li class="list-item" id="answer-{{ answer.id }}">
            <div style="flex: 1;">
                {% if answer.is_best %}<span class="badge">Best answer</span>{% endif %}
                <div class="body-text mt-4">{{ answer.body | escape | linebreaksbr | safe }}</div>
                <p class="meta mt-4">Answered by {{ answer.author }} {{ answer.created }}</p>
                {% if answer.can_accept or answer.can_delete %}
                <div class="actions">
                    {% if answer.can_accept %}
                    <form method="POST" action="/answers/{{ answer.id }}/accept">
                        <input type="hidden" name="csrf_token" value="{{ csrf_token }}">
                        <button type="submit" class="btn btn-secondary btn-sm">Mark as best</button>
                    </form>
                    {% endif %}
                    {% if answer.can_delete %}
                    <form method="POST" action="/answers/{{ answer.id }}" onsubmit="return confirm('Are you sure?')">
                        <input type="hidden" name="_method" value="DELETE">
                        <input type="hidden" name="csrf_token" value="{{ csrf_token }}">
                        <button type="submit" class="btn btn-danger btn-sm">Delete</button>
                    </form>
                    {% endif %}
                </div>
                {% endif %}
            </div>
        </li>
        {% endfor %}
    </ul>
    {% else %}
    <div class="empty"><p>No answers yet</p></div>
    {% endif %}
</div>

{% if current_user %}
<h2 class="mt-6">Your Answer</h2>
<div class="card">
    <div class="card-body">
        <form method="POST" action="/questions/{{ question.id }}/answers">
            <input type="hidden" name="csrf_token" value="{{ csrf_token }}">
            <div class="field">
                <textarea name="body" class="input{% if errors.body %} is-invalid{% endif %}">{{ old.body }}</textarea>
                {% if errors.body %}<div class="invalid-feedback">{{ errors.body }}</div>{% endif %}
            </div>
            <button type="submit" class="btn btn-primary">Post Your Answer</button>
        </form>
    </div>
</div>
{% else %}
<p class="meta mt-6"><a href="/login">Sign in</a> to answer this question.</p>
{% endif %}
{% endblock %}"##;

const QUESTION_FORM_TEMPLATE: &str = r##"<input type="hidden" name="csrf_token" value="{{ csrf_token }}">
<div class="field">
    <label for="question-title">Question Title</label>
    <input type="text" name="title" id="question-title" value="{{ old.title }}" class="input{% if errors.title %} is-invalid{% endif %}">
    {% if errors.title %}<div class="invalid-feedback">{{ errors.title }}</div>{% endif %}
</div>
<div class="field">
    <label for="question-body">Explain your question</label>
    <textarea name="body" id="question-body" class="input{% if errors.body %} is-invalid{% endif %}">{{ old.body }}</textarea>
    {% if errors.body %}<div class="invalid-feedback">{{ errors.body }}</div>{% endif %}
</div>
<div class="actions">
    <button type="submit" class="btn btn-primary">{{ button_text }}</button>
    <a href="/questions" class="btn btn-secondary">Back to all questions</a>
</div>"##;

const NEW_QUESTION_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}Ask Question - Q&amp;A{% endblock %}
{% block content %}
<h1>Ask Question</h1>
<div class="card">
    <div class="card-body">
        <form method="POST" action="/questions">
            {% include "question_form.html" %}
        </form>
    </div>
</div>
{% endblock %}"##;

const EDIT_QUESTION_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}Edit Question - Q&amp;A{% endblock %}
{% block content %}
<h1>Edit Question</h1>
<div class="card">
    <div class="card-body">
        <form method="POST" action="/questions/{{ question_id }}">
            <input type="hidden" name="_method" value="PUT">
            {% include "question_form.html" %}
        </form>
    </div>
</div>
{% endblock %}"##;

const LOGIN_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}Login - Q&amp;A{% endblock %}
{% block content %}
<h1>Login</h1>
{% if error %}<div class="alert alert-error">{{ error }}</div>{% endif %}
{% if message %}<div class="alert alert-success">{{ message }}</div>{% endif %}
<div class="card">
    <div class="card-body">
        <form method="POST" action="/login">
            <div class="field">
                <label for="username">Username</label>
                <input type="text" name="username" id="username" class="input" value="{{ username }}" autofocus>
            </div>
            <div class="field">
                <label for="password">Password</label>
                <input type="password" name="password" id="password" class="input">
            </div>
            <div class="actions">
                <button type="submit" class="btn btn-primary">Login</button>
                <a href="/register" class="btn btn-secondary">Create an account</a>
            </div>
        </form>
    </div>
</div>
{% endblock %}"##;

const REGISTER_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}Register - Q&amp;A{% endblock %}
{% block content %}
<h1>Register</h1>
<div class="card">
    <div class="card-body">
        <form method="POST" action="/register">
            <div class="field">
                <label for="username">Username</label>
                <input type="text" name="username" id="username" value="{{ old.username }}" class="input{% if errors.username %} is-invalid{% endif %}">
                {% if errors.username %}<div class="invalid-feedback">{{ errors.username }}</div>{% endif %}
            </div>
            <div class="field">
                <label for="email">E-Mail Address</label>
                <input type="email" name="email" id="email" value="{{ old.email }}" class="input{% if errors.email %} is-invalid{% endif %}">
                {% if errors.email %}<div class="invalid-feedback">{{ errors.email }}</div>{% endif %}
            </div>
            <div class="field">
                <label for="password">Password</label>
                <input type="password" name="password" id="password" class="input{% if errors.password %} is-invalid{% endif %}">
                {% if errors.password %}<div class="invalid-feedback">{{ errors.password }}</div>{% endif %}
            </div>
            <div class="field">
                <label for="password-confirm">Confirm Password</label>
                <input type="password" name="password_confirmation" id="password-confirm" class="input{% if errors.password_confirmation %} is-invalid{% endif %}">
                {% if errors.password_confirmation %}<div class="invalid-feedback">{{ errors.password_confirmation }}</div>{% endif %}
            </div>
            <button type="submit" class="btn btn-primary">Register</button>
        </form>
    </div>
</div>
{% endblock %}"##;

const ERROR_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block title %}Error - Q&amp;A{% endblock %}
{% block content %}
<div class="card">
    <div style="padding: 48px; text-align: center;">
        <h1 style="margin-bottom: 16px;">{{ status }}</h1>
        <p class="body-text">{{ message }}</p>
        <a href="/questions" class="btn btn-secondary mt-6">Back to all questions</a>
    </div>
</div>
{% endblock %}"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_parse() {
        for name in [
            "questions.html",
            "question.html",
            "new_question.html",
            "edit_question.html",
            "login.html",
            "register.html",
            "error.html",
        ] {
            assert!(
                TEMPLATES.get_template_names().any(|n| n == name),
                "missing template {}",
                name
            );
        }
    }

    #[test]
    fn test_error_page_escapes_message() {
        let mut context = Context::new();
        context.insert("status", &404);
        context.insert("message", "<script>alert(1)</script>");

        let html = render("error.html", &context).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
    }
}
