//! Command handlers. Each one opens what it needs, runs a single action, and
//! prints the result as text or JSON.
use super::{render, ArticleArgs, ArticlesCommand, CategoriesCommand, Command, ListArgs, ReadCommand};
use anyhow::{anyhow, bail, Context, Result};
use newsdesk::api::{ApiClient, ApiError, CollectionClient};
use newsdesk::collection::{
    LocalCollection, ListView, MutationCoordinator, MutationError, Page, PagingStrategy, Target,
};
use newsdesk::config::Config;
use newsdesk::forms::{ArticleForm, CategoryForm, FieldErrors, LoginForm, RegisterForm, Thumbnail};
use newsdesk::models::{Article, Category, DraftSource, Entity, PreviewDraft, Role, User};
use newsdesk::reader;
use newsdesk::session::{authorize, GuardError, Session, ADMIN_ONLY, ANY_ROLE};
use newsdesk::storage::Database;
use newsdesk::util::validate_image_url;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::json;
use std::io::{BufRead, Write};

/// Shared state for one invocation.
pub struct App {
    config: Config,
    db: Database,
    json: bool,
}

/// True if `err` came from the API rejecting the token.
pub fn is_unauthorized(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(api) = cause.downcast_ref::<ApiError>() {
            return api.is_unauthorized();
        }
        matches!(cause.downcast_ref::<MutationError>(), Some(MutationError::Api(api)) if api.is_unauthorized())
    })
}

impl App {
    pub fn new(config: Config, db: Database, json: bool) -> Self {
        Self { config, db, json }
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Login { username, password } => self.login(username, password).await,
            Command::Register {
                username,
                password,
                role,
            } => self.register(username, password, role).await,
            Command::Logout => self.logout().await,
            Command::Profile => self.profile().await,
            Command::Articles(cmd) => self.articles(cmd).await,
            Command::Categories(cmd) => self.categories(cmd).await,
            Command::Read(cmd) => self.read(cmd).await,
        }
    }

    /// Forget the stored session after the API rejected it.
    pub async fn drop_session(&self) -> Result<()> {
        if self.db.clear_session().await? {
            tracing::info!("Cleared rejected session");
        }
        Ok(())
    }

    // ========================================================================
    // Clients
    // ========================================================================

    fn client(&self) -> Result<ApiClient> {
        ApiClient::new(&self.config.base_url, self.config.request_timeout())
            .context("Cannot build API client")
    }

    /// Client carrying the stored token, once the session passes the role check.
    async fn authed(&self, allowed: &[Role]) -> Result<(ApiClient, User)> {
        let session = self.db.load_session().await?;
        let user = match authorize(session.as_ref(), allowed) {
            Ok(user) => user.clone(),
            Err(e) => {
                self.db.clear_session().await?;
                return Err(e.into());
            }
        };
        let token = session
            .map(|s| s.token)
            .ok_or(GuardError::NotLoggedIn)?;
        Ok((self.client()?.with_token(token), user))
    }

    // ========================================================================
    // Output
    // ========================================================================

    fn emit<T: Serialize + ?Sized>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }

    fn emit_page<E: Serialize>(&self, page: &Page<&E>, text: impl FnOnce() -> String) -> Result<()> {
        let body = json!({
            "page": page.number,
            "pageSize": page.page_size,
            "total": page.total_items,
            "totalPages": page.total_pages,
            "items": page.items,
        });
        self.emit(&body, text)
    }

    // ========================================================================
    // Account
    // ========================================================================

    async fn login(&self, username: String, password: Option<String>) -> Result<()> {
        let form = LoginForm {
            username,
            password: password_or_prompt(password)?,
        };
        check(form.validate())?;

        let client = self.client()?;
        let token = client
            .login(form.username.trim(), &form.password)
            .await
            .context("Login failed")?;
        let client = client.with_token(SecretString::from(token.expose_secret().to_owned()));
        let user = client.profile().await.context("Failed to fetch profile")?;

        self.db.save_session(&Session::new(token, user.clone())).await?;
        self.emit(&user, || {
            format!("Logged in as {} ({})", user.username, user.role)
        })
    }

    async fn register(&self, username: String, password: Option<String>, role: String) -> Result<()> {
        let form = RegisterForm {
            username,
            password: password_or_prompt(password)?,
            role,
        };
        check(form.validate())?;
        let role = form.role().ok_or_else(|| anyhow!("Please select a valid role"))?;

        self.client()?
            .register(form.username.trim(), &form.password, role)
            .await
            .context("Registration failed")?;
        println!("Registered {} as {}. Log in with `newsdesk login {}`.", form.username.trim(), role, form.username.trim());
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        if self.db.clear_session().await? {
            println!("Logged out");
        } else {
            println!("No session stored");
        }
        Ok(())
    }

    async fn profile(&self) -> Result<()> {
        let (client, _) = self.authed(ANY_ROLE).await?;
        let user = client.profile().await?;
        self.emit(&user, || {
            format!("{} ({}) id={}", user.username, user.role, user.id)
        })
    }

    // ========================================================================
    // Articles
    // ========================================================================

    async fn articles(&self, command: ArticlesCommand) -> Result<()> {
        match command {
            ArticlesCommand::List(args) => {
                let (client, _) = self.authed(ADMIN_ONLY).await?;
                let view = self
                    .load_list::<Article>(&client, &args, self.config.admin_page_size)
                    .await?;
                let page = view.current_page();
                self.emit_page(&page, || {
                    render::article_table(&page, &view.category_options())
                })
            }
            ArticlesCommand::Show { id } => {
                let (client, _) = self.authed(ADMIN_ONLY).await?;
                let article = client.get::<Article>(&id).await?;
                self.emit(&article, || render::article_detail(&article))
            }
            ArticlesCommand::Create(args) => self.save_article(None, args).await,
            ArticlesCommand::Edit { id, args } => self.save_article(Some(id), args).await,
            ArticlesCommand::Delete { id, yes } => self.delete::<Article>(&id, yes).await,
            ArticlesCommand::Preview { submit, discard } => {
                if discard {
                    self.discard_preview().await
                } else if submit {
                    self.submit_preview().await
                } else {
                    self.show_preview().await
                }
            }
        }
    }

    async fn load_list<E: Entity>(
        &self,
        client: &ApiClient,
        args: &ListArgs,
        page_size: usize,
    ) -> Result<ListView<E>> {
        let mut view = ListView::<E>::new(page_size, PagingStrategy::ClientSide)?;
        view.set_query(args.query.as_str());
        view.set_category(args.category.clone().filter(|c| !c.is_empty()));
        view.set_sort(args.sort);
        view.request_page(args.page);
        view.load(client)
            .await
            .with_context(|| format!("Failed to load {}", E::KIND))?;
        Ok(view)
    }

    async fn save_article(&self, id: Option<String>, args: ArticleArgs) -> Result<()> {
        let (client, _) = self.authed(ADMIN_ONLY).await?;

        let mut cache = LocalCollection::new();
        let mut form = match &id {
            Some(id) => {
                let current = client.get::<Article>(id).await?;
                let form = ArticleForm::from_article(&current);
                cache.replace(vec![current]);
                form
            }
            None => ArticleForm::default(),
        };

        // Coming back from the preview screen: the parked draft wins over the
        // server copy, and is consumed.
        let source = if id.is_some() { DraftSource::Edit } else { DraftSource::Create };
        if let Some(draft) = self.db.peek_preview().await? {
            if draft.source == source && draft.id == id {
                self.db.take_preview().await?;
                tracing::debug!(?source, "Resuming from preview draft");
                form = draft_form(draft);
            }
        }

        apply_article_args(&mut form, &args).await?;

        if args.preview {
            return self.park_preview(&client, id, form).await;
        }

        let target = id.map_or(Target::Create, Target::Update);
        let mut coordinator = MutationCoordinator::new(&client, self.config.reconcile);
        let saved = coordinator
            .submit_article(&mut cache, &target, &form)
            .await
            .map_err(mutation_error)?;
        self.emit(&saved, || {
            format!("Saved article \"{}\" ({})", saved.title, saved.id)
        })
    }

    async fn park_preview(&self, client: &ApiClient, id: Option<String>, form: ArticleForm) -> Result<()> {
        check(form.validate())?;
        let thumbnail = match form.thumbnail {
            Thumbnail::Uploaded(url) => url,
            Thumbnail::Pending(path) => client.upload_asset(&path).await?,
            Thumbnail::Missing => bail!("Choose a thumbnail"),
        };
        let draft = PreviewDraft {
            source: if id.is_some() { DraftSource::Edit } else { DraftSource::Create },
            id,
            title: form.title.trim().to_string(),
            content: form.content,
            category_id: form.category_id.unwrap_or_default(),
            thumbnail,
        };
        self.db.put_preview(&draft).await?;
        let category = category_name(client, &draft.category_id).await?;
        self.emit(&draft, || {
            format!(
                "{}\n\nSubmit with `newsdesk articles preview --submit`, or discard with --discard.",
                render::preview(&draft, &category)
            )
        })
    }

    async fn show_preview(&self) -> Result<()> {
        let (client, _) = self.authed(ADMIN_ONLY).await?;
        let Some(draft) = self.db.peek_preview().await? else {
            println!("No preview draft saved");
            return Ok(());
        };
        let category = category_name(&client, &draft.category_id).await?;
        self.emit(&draft, || render::preview(&draft, &category))
    }

    /// Publish the draft. It is only removed once the save succeeds.
    async fn submit_preview(&self) -> Result<()> {
        let (client, _) = self.authed(ADMIN_ONLY).await?;
        let Some(draft) = self.db.peek_preview().await? else {
            bail!("No preview draft saved");
        };

        let mut cache = LocalCollection::new();
        let target = match (&draft.source, &draft.id) {
            (DraftSource::Edit, Some(id)) => {
                cache.replace(vec![client.get::<Article>(id).await?]);
                Target::Update(id.clone())
            }
            _ => Target::Create,
        };
        let form = draft_form(draft);

        let mut coordinator = MutationCoordinator::new(&client, self.config.reconcile);
        let saved = coordinator
            .submit_article(&mut cache, &target, &form)
            .await
            .map_err(mutation_error)?;
        self.db.take_preview().await?;
        self.emit(&saved, || {
            format!("Published \"{}\" ({})", saved.title, saved.id)
        })
    }

    async fn discard_preview(&self) -> Result<()> {
        match self.db.take_preview().await? {
            Some(draft) => println!("Discarded preview of \"{}\"", draft.title),
            None => println!("No preview draft saved"),
        }
        Ok(())
    }

    /// Two-step delete: the entity is looked up first so the prompt can name it.
    async fn delete<E: Entity>(&self, id: &str, yes: bool) -> Result<()> {
        let (client, _) = self.authed(ADMIN_ONLY).await?;
        let mut cache = LocalCollection::from_items(client.list::<E>().await?);

        let mut coordinator = MutationCoordinator::new(&client, self.config.reconcile);
        coordinator.request_delete::<E>(id)?;
        let label = cache
            .get(id)
            .map_or_else(|| id.to_owned(), |e| e.title().to_owned());

        if !yes && !confirm(&format!("Delete {} \"{}\"?", E::KIND, label))? {
            coordinator.cancel_delete();
            println!("Cancelled");
            return Ok(());
        }

        let deleted = coordinator
            .confirm_delete::<E>(&mut cache)
            .await
            .map_err(mutation_error)?;
        let remaining = cache.total();
        self.emit(&json!({ "deleted": deleted, "remaining": remaining }), || {
            format!("Deleted {} {}. {} remaining.", E::KIND, deleted, remaining)
        })
    }

    // ========================================================================
    // Categories
    // ========================================================================

    async fn categories(&self, command: CategoriesCommand) -> Result<()> {
        match command {
            CategoriesCommand::List { query, page } => {
                let (client, _) = self.authed(ADMIN_ONLY).await?;
                let mut view =
                    ListView::<Category>::new(self.config.admin_page_size, self.config.category_paging)?;
                view.set_query(query);
                view.request_page(page);
                view.load(&client).await.context("Failed to load categories")?;
                let page = view.current_page();
                let narrowed = view.is_server_paged() && !view.filter().is_empty();
                self.emit_page(&page, || render::category_table(&page, narrowed))
            }
            CategoriesCommand::Create { name } => {
                let (client, user) = self.authed(ADMIN_ONLY).await?;
                let user_id = Some(user.id).filter(|id| !id.is_empty());
                self.save_category(&client, Target::Create, CategoryForm { name }, user_id)
                    .await
            }
            CategoriesCommand::Rename { id, name } => {
                let (client, _) = self.authed(ADMIN_ONLY).await?;
                self.save_category(&client, Target::Update(id), CategoryForm { name }, None)
                    .await
            }
            CategoriesCommand::Delete { id, yes } => self.delete::<Category>(&id, yes).await,
        }
    }

    async fn save_category(
        &self,
        client: &ApiClient,
        target: Target,
        form: CategoryForm,
        user_id: Option<String>,
    ) -> Result<()> {
        check(form.validate())?;
        let mut cache = LocalCollection::new();
        if let Target::Update(id) = &target {
            cache.replace(vec![client.get::<Category>(id).await?]);
        }

        let mut coordinator = MutationCoordinator::new(client, self.config.reconcile);
        let saved = coordinator
            .submit_category(&mut cache, &target, &form, user_id)
            .await
            .map_err(mutation_error)?;
        self.emit(&saved, || {
            format!("Saved category \"{}\" ({})", saved.name, saved.id)
        })
    }

    // ========================================================================
    // Reader
    // ========================================================================

    async fn read(&self, command: ReadCommand) -> Result<()> {
        let (client, _) = self.authed(ANY_ROLE).await?;
        match command {
            ReadCommand::List(args) => {
                let view = self
                    .load_list::<Article>(&client, &args, self.config.reader_page_size)
                    .await?;
                let page = view.current_page();
                self.emit_page(&page, || {
                    let mut out = render::article_cards(&page);
                    let options = view.category_options();
                    if !options.is_empty() {
                        out.push_str(&format!("\nCategories: {}", options.join(", ")));
                    }
                    out
                })
            }
            ReadCommand::Show { id } => {
                let article = client.get::<Article>(&id).await?;
                let others = match reader::recommendations(&client, &id).await {
                    Ok(others) => others,
                    Err(e) if e.is_unauthorized() => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not load recommendations");
                        Vec::new()
                    }
                };
                self.emit(&json!({ "article": article, "recommendations": others }), || {
                    let mut out = render::article_detail(&article);
                    let more = render::recommendations(&others);
                    if !more.is_empty() {
                        out.push_str("\n\n");
                        out.push_str(more.trim_end());
                    }
                    out
                })
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Print field errors and fail if there are any.
fn check(errors: FieldErrors) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    eprintln!("{}", render::field_errors(&errors));
    bail!("Form has {} invalid field(s)", errors.len())
}

fn mutation_error(err: MutationError) -> anyhow::Error {
    match err {
        MutationError::Validation(errors) => match check(errors) {
            Err(e) => e,
            Ok(()) => anyhow!("Form is invalid"),
        },
        other => other.into(),
    }
}

fn draft_form(draft: PreviewDraft) -> ArticleForm {
    ArticleForm {
        title: draft.title,
        content: draft.content,
        category_id: Some(draft.category_id).filter(|c| !c.is_empty()),
        thumbnail: Some(draft.thumbnail)
            .filter(|t| !t.is_empty())
            .map_or(Thumbnail::Missing, Thumbnail::Uploaded),
    }
}

/// Overlay the given flags onto a (possibly pre-filled) form.
async fn apply_article_args(form: &mut ArticleForm, args: &ArticleArgs) -> Result<()> {
    if let Some(title) = &args.title {
        form.title = title.clone();
    }
    if let Some(category) = &args.category {
        form.category_id = Some(category.clone());
    }
    if let Some(content) = &args.content {
        form.content = content.clone();
    }
    if let Some(path) = &args.content_file {
        form.content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
    }
    if let Some(path) = &args.thumbnail {
        form.thumbnail = Thumbnail::Pending(path.clone());
    }
    if let Some(url) = &args.image_url {
        let url = validate_image_url(url).context("Invalid thumbnail URL")?;
        form.thumbnail = Thumbnail::Uploaded(url.to_string());
    }
    Ok(())
}

/// Category name for the preview header, or "Uncategorized" if it can't be found.
async fn category_name<C: CollectionClient>(client: &C, id: &str) -> Result<String> {
    match client.get::<Category>(id).await {
        Ok(category) => Ok(category.name),
        Err(e) if e.is_unauthorized() => Err(e.into()),
        Err(e) => {
            tracing::debug!(id = %id, error = %e, "Category lookup failed");
            Ok("Uncategorized".to_string())
        }
    }
}

fn password_or_prompt(password: Option<String>) -> Result<SecretString> {
    if let Some(password) = password {
        return Ok(SecretString::from(password));
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
