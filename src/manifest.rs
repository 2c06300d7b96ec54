//! Expected schema and sample rows.
//!
//! The built-in manifest describes the learning-platform schema (lectures,
//! chapters, community, showcase, SaaS catalogue, payments, enrollments).
//! An alternative manifest can be loaded from a JSON file with the same shape:
//!
//! ```json
//! {
//!   "tables": [{"name": "t", "ddl": "CREATE TABLE ...", "dependencies": []}],
//!   "samples": [{"table": "t", "fields": {"id": "sample-1"}}]
//! }
//! ```

use crate::ddl::DdlRegistry;
use crate::errors::{AppError, ResultExt};
use crate::models::{SampleRecord, TableSpec};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub tables: Vec<TableSpec>,
    #[serde(default)]
    pub samples: Vec<SampleRecord>,
}

impl Manifest {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&raw)
            .with_context(|| format!("parsing manifest {}", path.display()))?;
        tracing::info!(
            "Loaded manifest {} ({} tables, {} samples)",
            path.display(),
            manifest.tables.len(),
            manifest.samples.len()
        );
        Ok(manifest)
    }

    /// Loads `path` when given, the built-in manifest otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(p) => Self::from_path(p),
            None => Ok(Self::builtin()),
        }
    }

    /// Validates the tables into a registry and indexes samples by table.
    ///
    /// Samples naming an unknown table are a configuration error.
    pub fn into_parts(
        self,
    ) -> Result<(DdlRegistry, BTreeMap<String, SampleRecord>), AppError> {
        let registry = DdlRegistry::new(self.tables)?;
        let mut samples = BTreeMap::new();
        for sample in self.samples {
            if registry.get(&sample.table).is_none() {
                return Err(AppError::Config(format!(
                    "sample row for unknown table {}",
                    sample.table
                )));
            }
            let table = sample.table.clone();
            if samples.insert(table.clone(), sample).is_some() {
                return Err(AppError::Config(format!(
                    "more than one sample row for table {}",
                    table
                )));
            }
        }
        Ok((registry, samples))
    }

    pub fn builtin() -> Self {
        Self {
            tables: builtin_tables(),
            samples: builtin_samples(),
        }
    }
}

fn builtin_tables() -> Vec<TableSpec> {
    vec![
        TableSpec::new(
            "profiles",
            r#"
CREATE TABLE public.profiles (
    id UUID PRIMARY KEY REFERENCES auth.users(id) ON DELETE CASCADE,
    email TEXT UNIQUE,
    full_name TEXT,
    avatar_url TEXT,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'instructor', 'admin')),
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);
ALTER TABLE public.profiles ENABLE ROW LEVEL SECURITY;
"#,
            &[],
        ),
        TableSpec::new(
            "lectures",
            r#"
CREATE TABLE public.lectures (
    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::TEXT,
    title TEXT NOT NULL,
    description TEXT,
    instructor_id UUID REFERENCES public.profiles(id) ON DELETE SET NULL,
    price INTEGER NOT NULL DEFAULT 0,
    thumbnail_url TEXT,
    is_published BOOLEAN DEFAULT false,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);
ALTER TABLE public.lectures ENABLE ROW LEVEL SECURITY;
"#,
            &["profiles"],
        ),
        TableSpec::new(
            "community_posts",
            r#"
CREATE TABLE public.community_posts (
    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::TEXT,
    author_id UUID REFERENCES public.profiles(id) ON DELETE SET NULL,
    author_name TEXT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    category TEXT NOT NULL,
    tags TEXT[] DEFAULT '{}',
    views INTEGER DEFAULT 0,
    likes INTEGER DEFAULT 0,
    comments_count INTEGER DEFAULT 0,
    is_pinned BOOLEAN DEFAULT false,
    is_featured BOOLEAN DEFAULT false,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);
ALTER TABLE public.community_posts ENABLE ROW LEVEL SECURITY;
"#,
            &["profiles"],
        ),
        TableSpec::new(
            "showcase_sites",
            r#"
CREATE TABLE public.showcase_sites (
    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::TEXT,
    name TEXT NOT NULL,
    description TEXT,
    url TEXT NOT NULL UNIQUE,
    thumbnail_url TEXT,
    category TEXT,
    tags TEXT[] DEFAULT '{}',
    views INTEGER DEFAULT 0,
    likes INTEGER DEFAULT 0,
    is_featured BOOLEAN DEFAULT false,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);
ALTER TABLE public.showcase_sites ENABLE ROW LEVEL SECURITY;
"#,
            &[],
        ),
        TableSpec::new(
            "lecture_chapters",
            r#"
CREATE TABLE public.lecture_chapters (
    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::TEXT,
    lecture_id TEXT NOT NULL REFERENCES public.lectures(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT,
    video_url TEXT NOT NULL,
    duration INTEGER NOT NULL DEFAULT 0,
    order_index INTEGER NOT NULL,
    is_preview BOOLEAN DEFAULT false,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW(),
    UNIQUE(lecture_id, order_index)
);
ALTER TABLE public.lecture_chapters ENABLE ROW LEVEL SECURITY;
"#,
            &["lectures"],
        ),
        TableSpec::new(
            "saas_products",
            r#"
CREATE TABLE public.saas_products (
    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::TEXT,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    pricing_model TEXT NOT NULL CHECK (pricing_model IN ('free', 'freemium', 'paid', 'subscription')),
    price_monthly INTEGER DEFAULT 0,
    price_yearly INTEGER DEFAULT 0,
    website_url TEXT,
    logo_url TEXT,
    features TEXT[] DEFAULT '{}',
    tags TEXT[] DEFAULT '{}',
    rating DECIMAL(3,2) DEFAULT 0.0,
    review_count INTEGER DEFAULT 0,
    is_recommended BOOLEAN DEFAULT false,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);
ALTER TABLE public.saas_products ENABLE ROW LEVEL SECURITY;
"#,
            &[],
        ),
        TableSpec::new(
            "payments",
            r#"
CREATE TABLE public.payments (
    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::TEXT,
    user_id UUID REFERENCES auth.users(id) ON DELETE CASCADE,
    lecture_id TEXT REFERENCES public.lectures(id) ON DELETE CASCADE,
    amount INTEGER NOT NULL,
    currency TEXT DEFAULT 'KRW',
    status TEXT NOT NULL CHECK (status IN ('pending', 'completed', 'failed', 'refunded')),
    payment_method TEXT,
    transaction_id TEXT,
    provider TEXT,
    provider_payment_id TEXT,
    metadata JSONB DEFAULT '{}',
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);
ALTER TABLE public.payments ENABLE ROW LEVEL SECURITY;
"#,
            &["lectures"],
        ),
        TableSpec::new(
            "lecture_enrollments",
            r#"
CREATE TABLE public.lecture_enrollments (
    id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::TEXT,
    user_id UUID NOT NULL REFERENCES auth.users(id) ON DELETE CASCADE,
    lecture_id TEXT NOT NULL REFERENCES public.lectures(id) ON DELETE CASCADE,
    enrolled_at TIMESTAMPTZ DEFAULT NOW(),
    progress INTEGER DEFAULT 0,
    completed_at TIMESTAMPTZ,
    last_watched_chapter_id TEXT REFERENCES public.lecture_chapters(id),
    UNIQUE(user_id, lecture_id)
);
ALTER TABLE public.lecture_enrollments ENABLE ROW LEVEL SECURITY;
"#,
            &["lectures", "lecture_chapters"],
        ),
    ]
}

// profiles rows belong to the auth system and payments/enrollments need a real
// user, so those tables have no sample row.
fn builtin_samples() -> Vec<SampleRecord> {
    vec![
        SampleRecord::new(
            "lectures",
            json!({
                "id": "ai-agent-master",
                "title": "AI Agent Master Course",
                "description": "Build production AI agents on top of LLM APIs.",
                "price": 0,
                "is_published": false
            }),
        ),
        SampleRecord::new(
            "community_posts",
            json!({
                "id": "sample-post-1",
                "title": "AI Agent Master Course review",
                "content": "The hands-on projects with the ChatGPT API taught me a lot.",
                "category": "review",
                "author_name": "student1",
                "tags": ["AI", "review", "ChatGPT"],
                "views": 156,
                "likes": 23,
                "comments_count": 5,
                "is_pinned": false,
                "is_featured": true
            }),
        ),
        SampleRecord::new(
            "showcase_sites",
            json!({
                "id": "sample-site-1",
                "name": "AI Content Generator",
                "description": "Automatic content generation powered by ChatGPT.",
                "url": "https://ai-content-generator.example.com",
                "thumbnail_url": "https://via.placeholder.com/400x300/1a1a1a/f4c430?text=AI+Content",
                "category": "AI",
                "tags": ["AI", "Content", "ChatGPT"],
                "views": 1234,
                "likes": 89,
                "is_featured": true
            }),
        ),
        SampleRecord::new(
            "lecture_chapters",
            json!({
                "id": "chapter-1",
                "lecture_id": "ai-agent-master",
                "title": "Introduction and overview",
                "description": "Course scope and learning goals.",
                "video_url": "https://www.youtube.com/watch?v=sample1",
                "duration": 900,
                "order_index": 1,
                "is_preview": true
            }),
        ),
        SampleRecord::new(
            "saas_products",
            json!({
                "id": "product-1",
                "name": "ChatGPT Plus",
                "description": "Premium AI assistant subscription from OpenAI.",
                "category": "AI Assistant",
                "pricing_model": "subscription",
                "price_monthly": 20000,
                "website_url": "https://chat.openai.com",
                "features": ["GPT-4 access", "Higher usage limits", "Plugin support"],
                "tags": ["AI", "ChatGPT", "OpenAI"],
                "rating": 4.8,
                "is_recommended": true
            }),
        ),
    ]
}
