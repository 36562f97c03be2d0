//! Declarative view of a form session.
//!
//! The view is an ordered list of controls, each carrying its label, current
//! value, options and the error shown under it. Select values are strings
//! with `""` standing for "nothing selected".

use serde::Serialize;
use uuid::Uuid;

use super::avatar::AVATAR_MAX_BYTES;
use super::countries;
use super::schema::FieldError;
use super::session::FormSession;
use super::values::{phone_code_path, phone_number_path};
use crate::i18n::{format_bytes, Translator};

/// Display format of the birthday picker.
pub const BIRTHDAY_FORMAT: &str = "dd/MM/yyyy";

/// Rows of the multiline about field.
pub const ABOUT_ROWS: u8 = 4;

const FORM_KEY: &str = "dashboard.account.form";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub session_id: Uuid,
    pub lang: String,
    pub controls: Vec<Control>,
    pub submit: SubmitButton,
    pub errors: Vec<FieldError>,
    /// Values differ from the stored record.
    pub dirty: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Control {
    #[serde(rename_all = "camelCase")]
    Avatar {
        name: &'static str,
        value: Option<String>,
        staged: bool,
        helper_text: String,
        max_size: usize,
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        name: String,
        label: String,
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        rows: Option<u8>,
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Select {
        name: &'static str,
        label: String,
        value: String,
        options: Vec<SelectOption>,
        /// The value is not among the options.
        orphaned: bool,
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Date {
        name: &'static str,
        label: String,
        value: Option<String>,
        format: &'static str,
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Phone {
        index: usize,
        code: CountryPicker,
        number: Box<Control>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    fn new(value: impl ToString, label: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryPicker {
    pub name: String,
    pub value: String,
    /// Flag of the country the dialing code resolves to.
    pub flag: Option<String>,
    pub country_code: Option<String>,
    pub placeholder: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitButton {
    pub label: String,
    pub disabled: bool,
}

impl FormView {
    /// Renders `session` in the language of `translator`. `languages` are
    /// the keys offered by the language select.
    pub fn render(session: &FormSession, translator: &Translator, languages: &[&str]) -> Self {
        let renderer = Renderer { session, translator };
        let values = session.values();

        let mut controls = vec![
            renderer.avatar(),
            renderer.text("firstName", &values.first_name),
            renderer.text("lastName", &values.last_name),
            renderer.region(),
            renderer.town(),
            renderer.text("userId", &values.user_id),
            renderer.text("email", &values.email),
        ];
        controls.extend((0..values.phone_numbers.len()).map(|slot| renderer.phone(slot)));
        controls.push(renderer.birthday());
        controls.push(renderer.sex());
        controls.push(renderer.lang(languages));
        controls.push(renderer.multiline("about", &values.about, ABOUT_ROWS));

        Self {
            session_id: session.id(),
            lang: translator.lang().to_string(),
            controls,
            submit: SubmitButton {
                label: translator.t(&format!("{FORM_KEY}.saveChangesButton")),
                disabled: session.is_submitting(),
            },
            errors: session.errors().cloned().collect(),
            dirty: session.has_unsaved_changes(),
        }
    }

    pub fn control(&self, name: &str) -> Option<&Control> {
        self.controls.iter().find(|control| control.name() == Some(name))
    }
}

impl Control {
    /// Field path of the control; phone rows have none of their own.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Avatar { name, .. } | Self::Select { name, .. } | Self::Date { name, .. } => Some(*name),
            Self::Text { name, .. } => Some(name.as_str()),
            Self::Phone { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Avatar { error, .. }
            | Self::Text { error, .. }
            | Self::Select { error, .. }
            | Self::Date { error, .. } => error.as_deref(),
            Self::Phone { number, .. } => number.error(),
        }
    }
}

struct Renderer<'a> {
    session: &'a FormSession,
    translator: &'a Translator,
}

impl Renderer<'_> {
    fn label(&self, name: &str) -> String {
        self.translator.t(&format!("{FORM_KEY}.labels.{name}"))
    }

    fn none_option(&self) -> SelectOption {
        SelectOption::new("", self.translator.t(&format!("{FORM_KEY}.none")))
    }

    fn error(&self, path: &str) -> Option<String> {
        self.session.error_for(path).map(|error| error.message.clone())
    }

    fn text(&self, name: &str, value: &str) -> Control {
        Control::Text {
            name: name.to_string(),
            label: self.label(name),
            value: value.to_string(),
            rows: None,
            error: self.error(name),
        }
    }

    fn multiline(&self, name: &str, value: &str, rows: u8) -> Control {
        Control::Text {
            name: name.to_string(),
            label: self.label(name),
            value: value.to_string(),
            rows: Some(rows),
            error: self.error(name),
        }
    }

    fn avatar(&self) -> Control {
        let max_size = format_bytes(AVATAR_MAX_BYTES as u64);
        let avatar = self.session.values().avatar.as_ref();

        Control::Avatar {
            name: "avatar",
            value: avatar.map(|avatar| avatar.display_url().to_string()),
            staged: self.session.staged_avatar().is_some(),
            helper_text: self
                .translator
                .t_with(&format!("{FORM_KEY}.avatar.dropHelperText"), &[("maxSize", &max_size)]),
            max_size: AVATAR_MAX_BYTES,
            error: self.error("avatar"),
        }
    }

    fn region(&self) -> Control {
        let region = self.session.values().region;
        let regions = &self.session.context().regions;

        let mut options = vec![self.none_option()];
        options.extend(regions.iter().map(|r| SelectOption::new(r.id, r.region.clone())));

        Control::Select {
            name: "region",
            label: self.label("region"),
            value: id_value(region),
            orphaned: region.is_some_and(|id| !regions.iter().any(|r| r.id == id)),
            options,
            error: self.error("region"),
        }
    }

    fn town(&self) -> Control {
        let town = self.session.values().town;
        let cascade = self.session.cascade();

        let mut options = vec![self.none_option()];
        options.extend(
            cascade
                .visible_towns()
                .iter()
                .map(|t| SelectOption::new(t.id, t.town.clone())),
        );

        Control::Select {
            name: "town",
            label: self.label("town"),
            value: id_value(town),
            options,
            orphaned: cascade.is_orphaned(town),
            error: self.error("town"),
        }
    }

    fn phone(&self, slot: usize) -> Control {
        let row = &self.session.values().phone_numbers[slot];
        let country = countries::find_by_dialing_code(&row.phone_code);
        let code_path = phone_code_path(slot);
        let number_path = phone_number_path(slot);

        Control::Phone {
            index: slot,
            code: CountryPicker {
                value: row.phone_code.clone(),
                flag: country.map(|c| c.flag_icon()),
                country_code: country.map(|c| c.country_code.clone()),
                placeholder: self.label("phoneCode"),
                error: self.error(&code_path),
                name: code_path,
            },
            number: Box::new(Control::Text {
                label: self.label("phoneNumber"),
                value: row.number.clone(),
                rows: None,
                error: self.error(&number_path),
                name: number_path,
            }),
        }
    }

    fn birthday(&self) -> Control {
        Control::Date {
            name: "birthday",
            label: self.label("birthday"),
            value: self
                .session
                .values()
                .birthday
                .map(|date| date.format("%d/%m/%Y").to_string()),
            format: BIRTHDAY_FORMAT,
            error: self.error("birthday"),
        }
    }

    fn sex(&self) -> Control {
        let gender = |key: &str| self.translator.t(&format!("{FORM_KEY}.gender.{key}"));
        let sex = self.session.values().sex;

        Control::Select {
            name: "sex",
            label: self.label("gender"),
            value: id_value(sex),
            options: vec![
                self.none_option(),
                SelectOption::new(1, gender("male")),
                SelectOption::new(0, gender("female")),
            ],
            orphaned: sex.is_some_and(|sex| sex != 0 && sex != 1),
            error: self.error("sex"),
        }
    }

    fn lang(&self, languages: &[&str]) -> Control {
        let lang_key = &self.session.values().lang_key;

        Control::Select {
            name: "langKey",
            label: self.label("lang"),
            value: lang_key.clone(),
            options: languages
                .iter()
                .map(|lang| SelectOption::new(lang, self.translator.t(&format!("dashboard.lang.{lang}"))))
                .collect(),
            orphaned: !lang_key.is_empty() && !languages.contains(&lang_key.as_str()),
            error: self.error("langKey"),
        }
    }
}

fn id_value(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}
