use chrono::Local;
use iced::widget::{button, column, container, pick_list, row, scrollable, slider, text, Column, Row};
use iced::{Alignment, Element, Length, Task, Theme};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod generation;
mod state;

use error::ManagerError;
use generation::scheduler::{GenerationJob, GenerationOutcome};
use state::config::{KioskConfig, RANDOM_STYLE};
use state::data::{ImageId, ImageRecord, ParentRef};
use state::events::ManagerEvent;
use state::manager::ImageManager;

/// Images per gallery row
const GALLERY_COLUMNS: usize = 5;

/// Crossover slider starting position
const DEFAULT_CONTRIBUTION: u8 = 50;

/// Main application state
struct Kiosk {
    manager: ImageManager,
    /// Styles offered for new images
    styles: Vec<String>,
    style: String,
    /// Parent contribution for the next crossover (0 - 100)
    contribution: u8,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    NewImage,
    StyleSelected(String),
    Mutate,
    Crossover,
    ContributionChanged(u8),
    ToggleSelect(ImageId),
    Remove(ImageId),
    ClearAll,
    /// A background generation job finished (successfully or not)
    GenerationFinished(GenerationOutcome),
}

impl Kiosk {
    fn new(mut manager: ImageManager, config: &KioskConfig) -> Self {
        manager.subscribe(log_event);

        info!("🎨 Evolution kiosk ready, gallery holds {} images", manager.capacity());

        Kiosk {
            manager,
            styles: config.styles.clone(),
            style: config
                .styles
                .first()
                .cloned()
                .unwrap_or_else(|| RANDOM_STYLE.to_string()),
            contribution: DEFAULT_CONTRIBUTION,
            status: "Select an image to mutate it, or two to combine them.".to_string(),
        }
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::NewImage => {
                let job = self.manager.generate_new(Some(&self.style));
                run(job)
            }
            Message::StyleSelected(style) => {
                self.style = style;
                Task::none()
            }
            Message::Mutate => {
                let Some(id) = self.selected_ids().first().copied() else {
                    return Task::none();
                };
                match self.manager.mutate(id) {
                    Ok(job) => run(job),
                    Err(err) => self.reject(err),
                }
            }
            Message::Crossover => {
                let ids = self.selected_ids();
                let &[a, b] = ids.as_slice() else {
                    return Task::none();
                };
                let contribution = self.contribution;
                self.contribution = DEFAULT_CONTRIBUTION;
                match self.manager.crossover(a, b, contribution) {
                    Ok(job) => run(job),
                    Err(err) => self.reject(err),
                }
            }
            Message::ContributionChanged(value) => {
                self.contribution = value;
                Task::none()
            }
            Message::ToggleSelect(id) => {
                if let Err(err) = self.manager.toggle_selection(id) {
                    return self.reject(err);
                }
                Task::none()
            }
            Message::Remove(id) => {
                if let Some(name) = self.manager.get(id).map(ImageRecord::display_name) {
                    self.manager.remove(id);
                    self.status = format!("Removed #{}", name);
                }
                Task::none()
            }
            Message::ClearAll => {
                self.manager.clear();
                self.status = "Gallery cleared.".to_string();
                Task::none()
            }
            Message::GenerationFinished(outcome) => {
                self.status = match &outcome.result {
                    Ok(record) => format!("✅ {} is ready (score {:.2})", record.display_name(), record.score()),
                    Err(err) => format!("❌ {}", err),
                };
                let next = self.manager.complete(outcome);
                run(next)
            }
        }
    }

    fn reject(&mut self, err: ManagerError) -> Task<Message> {
        warn!("Request rejected: {}", err);
        self.status = err.to_string();
        Task::none()
    }

    fn selected_ids(&self) -> Vec<ImageId> {
        self.manager.selected().iter().map(ImageRecord::id).collect()
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let status = if self.manager.is_loading() {
            match self.manager.queued() {
                0 => "Being generated by AI…".to_string(),
                n => format!("Being generated by AI… ({} more waiting)", n),
            }
        } else {
            self.status.clone()
        };

        let content: Column<Message> = column![
            text("Evolution Kiosk").size(40),
            text(status).size(16),
            self.controls(),
            scrollable(self.gallery()).height(Length::Fill),
        ]
        .spacing(20)
        .padding(30)
        .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into()
    }

    /// Actions depend on how many images are selected
    fn controls(&self) -> Element<Message> {
        let actions: Row<Message> = match self.manager.selection_count() {
            0 => row![
                pick_list(self.styles.as_slice(), Some(&self.style), Message::StyleSelected),
                button("New image").on_press(Message::NewImage).padding(10),
            ],
            1 => row![button("Mutate").on_press(Message::Mutate).padding(10)],
            _ => row![
                text(format!("{}%", self.contribution)),
                slider(0..=100, self.contribution, Message::ContributionChanged).width(Length::Fixed(200.0)),
                text(format!("{}%", 100 - self.contribution)),
                button("Create child").on_press(Message::Crossover).padding(10),
            ],
        };

        let clear = button("Clear all")
            .on_press_maybe((!self.manager.images().is_empty()).then_some(Message::ClearAll))
            .padding(10);

        actions
            .push(clear)
            .spacing(15)
            .align_y(Alignment::Center)
            .into()
    }

    fn gallery(&self) -> Element<Message> {
        let rows = self.manager.images().chunks(GALLERY_COLUMNS).map(|chunk| -> Element<Message> {
            Row::with_children(chunk.iter().map(|record| self.card(record)))
                .spacing(15)
                .into()
        });

        Column::with_children(rows).spacing(15).into()
    }

    fn card(&self, record: &ImageRecord) -> Element<Message> {
        let id = record.id();
        let selected = self.manager.is_selected(id);

        let lineage = match (record.parent1(), record.parent2()) {
            (Some(a), Some(b)) => format!("from {} × {}", self.parent_label(a), self.parent_label(b)),
            (Some(a), None) => format!("from {}", self.parent_label(a)),
            _ => String::new(),
        };

        let select = button(if selected { "Unselect" } else { "Select" })
            .on_press_maybe(record.selectable().then_some(Message::ToggleSelect(id)));

        let card: Column<Message> = column![
            iced::widget::image(iced::widget::image::Handle::from_path(record.artifact_path()))
                .width(Length::Fixed(180.0))
                .height(Length::Fixed(180.0)),
            text(format!(
                "{}#{}  score {:.2}",
                if selected { "✔ " } else { "" },
                record.display_name(),
                record.score()
            ))
            .size(14),
            text(lineage).size(12),
            text(record.created_at().with_timezone(&Local).format("%H:%M:%S").to_string()).size(12),
            row![select, button("Remove").on_press(Message::Remove(id))].spacing(8),
        ]
        .spacing(6)
        .align_x(Alignment::Center);

        container(card).padding(8).into()
    }

    /// Parents already evicted from the gallery are marked
    fn parent_label(&self, parent: &ParentRef) -> String {
        match self.manager.get(parent.id) {
            Some(_) => format!("#{}", parent.name),
            None => format!("#{} (gone)", parent.name),
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn log_event(event: &ManagerEvent) {
    match event {
        ManagerEvent::SelectionChanged(record, selected) => {
            debug!("📣 {} {}", record.display_name(), if *selected { "selected" } else { "unselected" })
        }
        ManagerEvent::SelectionCountChanged(count) => debug!("📣 {} selected", count),
        ManagerEvent::ImageAdded(record) => debug!("📣 Added {}", record.display_name()),
        ManagerEvent::ImageRemoved(record) => debug!("📣 Removed {}", record.display_name()),
        ManagerEvent::LoadingChanged(loading) => debug!("📣 Loading: {}", loading),
        ManagerEvent::GenerationFailed(reason) => debug!("📣 Generation failed: {}", reason),
    }
}

/// Hand a released job to the runtime; it comes back as `GenerationFinished`
fn run(job: Option<GenerationJob>) -> Task<Message> {
    match job {
        Some(job) => Task::perform(job.run(), Message::GenerationFinished),
        None => Task::none(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("evolution_kiosk=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    init_tracing();

    if let Err(err) = launch() {
        error!("❌ {}", err);
        std::process::exit(1);
    }
}

fn launch() -> Result<(), Box<dyn std::error::Error>> {
    let config = KioskConfig::load()?;
    config.prepare_artifact_dir()?;
    let manager = ImageManager::from_config(&config)?;

    iced::application("Evolution Kiosk", Kiosk::update, Kiosk::view)
        .theme(Kiosk::theme)
        .centered()
        .run_with(move || (Kiosk::new(manager, &config), Task::none()))?;

    Ok(())
}
