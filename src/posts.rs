use crate::model::{Post, PostStatus, PostUpdate};

/// Status filter for the post list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostFilter {
  #[default]
  All,
  Status(PostStatus),
}

impl PostFilter {
  pub const ALL: [PostFilter; 4] = [
    PostFilter::All,
    PostFilter::Status(PostStatus::Draft),
    PostFilter::Status(PostStatus::Published),
    PostFilter::Status(PostStatus::Scheduled),
  ];

  pub fn label(self) -> &'static str {
    match self {
      PostFilter::All => "all",
      PostFilter::Status(status) => status.label(),
    }
  }

  pub fn matches(self, post: &Post) -> bool {
    match self {
      PostFilter::All => true,
      PostFilter::Status(status) => post.status == status,
    }
  }

  pub fn next(self) -> Self {
    let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostCounts {
  pub total: usize,
  pub draft: usize,
  pub published: usize,
  pub scheduled: usize,
}

/// The operator's view of blog posts.
#[derive(Debug, Default)]
pub struct PostDesk {
  posts: Vec<Post>,
  filter: PostFilter,
  loaded: bool,
}

impl PostDesk {
  pub fn filter(&self) -> PostFilter {
    self.filter
  }

  pub fn is_loaded(&self) -> bool {
    self.loaded
  }

  pub fn cycle_filter(&mut self) -> PostFilter {
    self.filter = self.filter.next();
    self.filter
  }

  pub fn replace(&mut self, posts: Vec<Post>) {
    self.posts = posts;
    self.loaded = true;
  }

  pub fn visible(&self) -> Vec<&Post> {
    self.posts.iter().filter(|p| self.filter.matches(p)).collect()
  }

  pub fn counts(&self) -> PostCounts {
    let count = |status: PostStatus| self.posts.iter().filter(|p| p.status == status).count();
    PostCounts {
      total: self.posts.len(),
      draft: count(PostStatus::Draft),
      published: count(PostStatus::Published),
      scheduled: count(PostStatus::Scheduled),
    }
  }

  /// Local echo of a status change until the next reload lands.
  pub fn set_status(&mut self, id: &str, status: PostStatus) {
    if let Some(post) = self.posts.iter_mut().find(|p| p.id == id) {
      post.status = status;
    }
  }

  pub fn remove(&mut self, id: &str) {
    self.posts.retain(|p| p.id != id);
  }

  /// Local echo of an edit until the next reload lands.
  pub fn apply_update(&mut self, id: &str, update: &PostUpdate) {
    if let Some(post) = self.posts.iter_mut().find(|p| p.id == id) {
      post.title = update.title.clone();
      post.category = update.category.clone();
      post.excerpt = Some(update.excerpt.clone()).filter(|e| !e.is_empty());
      post.thumbnail = Some(update.thumbnail.clone()).filter(|t| !t.is_empty());
    }
  }

  pub fn clear(&mut self) {
    *self = Self::default();
  }
}

// --- Editing ---

/// Single-line fields of the edit form, in focus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
  Title,
  Category,
  Excerpt,
  Thumbnail,
}

impl EditField {
  pub const ALL: [EditField; 4] = [EditField::Title, EditField::Category, EditField::Excerpt, EditField::Thumbnail];

  pub fn label(self) -> &'static str {
    match self {
      EditField::Title => "Title",
      EditField::Category => "Category",
      EditField::Excerpt => "Excerpt",
      EditField::Thumbnail => "Thumbnail",
    }
  }
}

/// Edit form for one post. The body is carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEditor {
  pub id: String,
  values: [String; 4],
  focus: usize,
  content: String,
}

impl PostEditor {
  pub fn new(post: &Post) -> Self {
    Self {
      id: post.id.clone(),
      values: [
        post.title.clone(),
        post.category.clone(),
        post.excerpt.clone().unwrap_or_default(),
        post.thumbnail.clone().unwrap_or_default(),
      ],
      focus: 0,
      content: post.content.clone(),
    }
  }

  pub fn focus(&self) -> EditField {
    EditField::ALL[self.focus]
  }

  pub fn value(&self, field: EditField) -> &str {
    &self.values[field as usize]
  }

  pub fn next_field(&mut self) {
    self.focus = (self.focus + 1) % EditField::ALL.len();
  }

  pub fn prev_field(&mut self) {
    self.focus = (self.focus + EditField::ALL.len() - 1) % EditField::ALL.len();
  }

  pub fn push(&mut self, c: char) {
    self.values[self.focus].push(c);
  }

  pub fn backspace(&mut self) {
    self.values[self.focus].pop();
  }

  pub fn update(&self) -> PostUpdate {
    let [title, category, excerpt, thumbnail] = self.values.clone();
    PostUpdate {
      title: title.trim().to_string(),
      category: category.trim().to_string(),
      excerpt: excerpt.trim().to_string(),
      content: self.content.clone(),
      thumbnail: thumbnail.trim().to_string(),
    }
  }
}
