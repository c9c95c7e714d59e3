use std::sync::Arc;

use dotenv::dotenv;
use interview_quiz::{
    config::BotConfig,
    error::{GenerateError, SessionError, StoreError},
    generator::QuestionGenerator,
    quiz::{
        report::QuizReport,
        session::{RequestToken, Session, Stage},
        store::SessionStore,
        Difficulty, Question, Topic,
    },
};
use teloxide::{
    dispatching::dialogue::{ErasedStorage, InMemStorage, Storage},
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup},
};

type QuizDialogue = Dialogue<Session, ErasedStorage<Session>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type SessionStorage = Arc<ErasedStorage<Session>>;

#[tokio::main]
async fn main() -> HandlerResult {
    // A missing .env is fine; the variables may come from the environment.
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting interview quiz bot...");

    let config = BotConfig::from_env()?;
    let bot = Bot::from_env();

    // Sessions live only as long as the process.
    let storage: SessionStorage = InMemStorage::<Session>::new().erase();
    let store = Arc::new(SessionStore::new(Arc::clone(&storage)));

    let generator = Arc::new(QuestionGenerator::new(
        config.questions_url.clone(),
        config.request_timeout,
    )?);
    log::info!("Questions are generated through {}", config.questions_url);

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<Session>, Session>()
            .branch(dptree::filter(|s: Session| s.is_selecting_topic()).endpoint(receive_topic))
            .branch(
                dptree::filter(|s: Session| s.is_selecting_difficulty())
                    .endpoint(receive_difficulty),
            )
            .branch(dptree::filter(|s: Session| s.is_in_quiz()).endpoint(receive_answer))
            .branch(
                dptree::filter(|s: Session| s.is_showing_results()).endpoint(receive_restart),
            ),
    )
    .dependencies(dptree::deps![storage, generator, store])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

const BACK_TO_TOPICS: &str = "⬅️ Back to topics";
const CHANGE_DIFFICULTY: &str = "🔁 Change difficulty";
const NEXT_QUESTION: &str = "Next ➡️";
const RESTART: &str = "🔄 Restart";

const GENERATION_FAILED: &str =
    "Sorry, we couldn't generate questions at the moment. Please try again later.";

fn topic_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(
        Topic::ALL
            .chunks(2)
            .map(|row| {
                row.iter()
                    .map(|t| KeyboardButton::new(t.label()))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>(),
    )
}

fn difficulty_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(Difficulty::Easy.label()),
            KeyboardButton::new(Difficulty::Medium.label()),
            KeyboardButton::new(Difficulty::Hard.label()),
        ],
        vec![KeyboardButton::new(Difficulty::Interview.label())],
        vec![KeyboardButton::new(BACK_TO_TOPICS)],
    ])
}

// Shown while questions are generated: the difficulty buttons are gone.
fn loading_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(BACK_TO_TOPICS)]])
}

fn shortcuts_row() -> Vec<KeyboardButton> {
    vec![
        KeyboardButton::new(BACK_TO_TOPICS),
        KeyboardButton::new(CHANGE_DIFFICULTY),
    ]
}

fn options_keyboard(question: &Question) -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = question
        .options
        .iter()
        .map(|o| vec![KeyboardButton::new(o.clone())])
        .collect();
    rows.push(shortcuts_row());
    KeyboardMarkup::new(rows)
}

fn next_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(NEXT_QUESTION)], shortcuts_row()])
}

async fn send_topic_menu(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    bot.send_message(chat_id, "Choose a topic to practice:")
        .reply_markup(topic_keyboard())
        .await?;
    Ok(())
}

async fn send_difficulty_menu(bot: &Bot, chat_id: ChatId, topic: Topic) -> HandlerResult {
    bot.send_message(chat_id, format!("Choose a difficulty\nFor {}", topic.name()))
        .reply_markup(difficulty_keyboard())
        .await?;
    Ok(())
}

async fn send_question(bot: &Bot, chat_id: ChatId, session: &Session) -> HandlerResult {
    let Stage::InQuiz {
        topic,
        difficulty,
        quiz,
    } = session.stage()
    else {
        return Ok(());
    };
    let Some(question) = quiz.current() else {
        return Ok(());
    };

    let text = format!(
        "[{}] {} ({})\n{}\n\nQuestion {} of {}\n{}",
        topic.icon(),
        topic.name(),
        difficulty.as_str(),
        quiz.score_line(),
        quiz.current_question + 1,
        quiz.questions.len(),
        question.text
    );
    bot.send_message(chat_id, text)
        .reply_markup(options_keyboard(question))
        .await?;
    Ok(())
}

fn results_text(report: &QuizReport) -> String {
    let mut text = report.headline();
    if report.is_perfect() {
        text.push_str("\n\nPerfect score! There is nothing to review, great job.");
    } else {
        text.push_str("\n\nTopics to review:");
        for area in &report.weak_areas {
            text.push_str(&format!("\n• {} ({} missed)", area.subtopic, area.misses));
        }
    }
    text
}

async fn send_results(bot: &Bot, chat_id: ChatId, session: &Session) -> HandlerResult {
    let Some(report) = session.report() else {
        return Ok(());
    };
    bot.send_message(chat_id, results_text(&report))
        .reply_markup(KeyboardMarkup::new(vec![vec![KeyboardButton::new(RESTART)]]))
        .await?;
    Ok(())
}

async fn receive_topic(
    bot: Bot,
    dialogue: QuizDialogue,
    session: Session,
    msg: Message,
) -> HandlerResult {
    // Anything that isn't a topic (including /start) just shows the menu.
    let Some(topic) = msg.text().and_then(Topic::from_label) else {
        send_topic_menu(&bot, msg.chat.id).await?;
        return Ok(());
    };

    send_difficulty_menu(&bot, msg.chat.id, topic).await?;
    dialogue.update(session.select_topic(topic)).await?;
    Ok(())
}

async fn receive_difficulty(
    bot: Bot,
    session: Session,
    msg: Message,
    generator: Arc<QuestionGenerator>,
    store: Arc<SessionStore>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    // A question request may finish on another task at any moment, so every
    // write here goes through the store instead of the injected dialogue.
    if msg.text() == Some(BACK_TO_TOPICS) {
        // Drops the pending token, if any; its response will be discarded.
        store
            .transition(chat_id, |s| Ok((s.back_to_topics(), ())))
            .await?;
        send_topic_menu(&bot, chat_id).await?;
        return Ok(());
    }

    let Some(difficulty) = msg.text().and_then(Difficulty::from_label) else {
        if session.pending().is_some() {
            bot.send_message(chat_id, "Still generating your questions, hang on...")
                .await?;
        } else {
            bot.send_message(chat_id, "Please choose one of the difficulty levels")
                .reply_markup(difficulty_keyboard())
                .await?;
        }
        return Ok(());
    };

    let (next, token) = match store
        .transition(chat_id, |s| s.request_questions(difficulty))
        .await
    {
        Ok(requested) => requested,
        Err(StoreError::Session(SessionError::RequestPending)) => {
            bot.send_message(chat_id, "Still generating your questions, hang on...")
                .await?;
            return Ok(());
        }
        Err(StoreError::Session(SessionError::NotSelectingDifficulty)) => {
            // The previous request finished while this message was queued.
            log::debug!("Ignoring difficulty choice in chat {}", chat_id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let Some(topic) = next.topic() else {
        return Err(SessionError::NoTopic.into());
    };

    let announced = bot
        .send_message(
            chat_id,
            format!(
                "Generating {} questions about {}...",
                difficulty.as_str(),
                topic.name()
            ),
        )
        .reply_markup(loading_keyboard())
        .await;
    if let Err(e) = announced {
        // Without a running request nothing would ever clear the pending token.
        store.abandon_request(chat_id, token).await?;
        return Err(e.into());
    }

    tokio::spawn(async move {
        let result = generator.generate(topic, difficulty).await;
        if let Err(e) = apply_generation(&bot, &store, chat_id, token, result).await {
            log::error!("Failed to deliver questions to chat {}: {}", chat_id, e);
        }
    });
    Ok(())
}

/// Applies a finished generation to whatever the chat's session is now.
async fn apply_generation(
    bot: &Bot,
    store: &SessionStore,
    chat_id: ChatId,
    token: RequestToken,
    result: Result<Vec<Question>, GenerateError>,
) -> HandlerResult {
    if let Err(e) = &result {
        log::warn!("Question generation for chat {} failed: {}", chat_id, e);
    }
    let applied = store
        .transition(chat_id, move |session| {
            let next = match result {
                Ok(questions) => session.start_quiz(token, questions)?,
                Err(_) => session.abort_request(token)?,
            };
            Ok((next, ()))
        })
        .await;
    let next = match applied {
        Ok((next, ())) => next,
        Err(StoreError::Session(SessionError::Stale(token))) => {
            log::debug!("Discarding {} for chat {}, the user moved on", token, chat_id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if next.is_in_quiz() {
        log::info!("Quiz started in chat {}", chat_id);
        send_question(bot, chat_id, &next).await?;
    } else {
        bot.send_message(chat_id, GENERATION_FAILED)
            .reply_markup(difficulty_keyboard())
            .await?;
    }
    Ok(())
}

async fn receive_answer(
    bot: Bot,
    dialogue: QuizDialogue,
    session: Session,
    msg: Message,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(text) = msg.text() else {
        bot.send_message(chat_id, "Please choose one of the options")
            .await?;
        return Ok(());
    };

    match text {
        BACK_TO_TOPICS => {
            dialogue.update(session.back_to_topics()).await?;
            send_topic_menu(&bot, chat_id).await?;
        }
        CHANGE_DIFFICULTY => {
            let next = session.change_difficulty()?;
            if let Some(topic) = next.topic() {
                send_difficulty_menu(&bot, chat_id, topic).await?;
            }
            dialogue.update(next).await?;
        }
        NEXT_QUESTION => match session.next_question() {
            Ok(next) => {
                dialogue.update(next.clone()).await?;
                if next.is_showing_results() {
                    log::info!("Quiz finished in chat {}", chat_id);
                    send_results(&bot, chat_id, &next).await?;
                } else {
                    send_question(&bot, chat_id, &next).await?;
                }
            }
            Err(SessionError::NotAnswered) => {
                bot.send_message(chat_id, "Pick an answer first").await?;
            }
            Err(e) => return Err(e.into()),
        },
        option => match session.answer(option) {
            Ok((next, outcome)) => {
                log::debug!("Chat {} answered correctly: {}", chat_id, outcome.correct);
                let feedback = if outcome.correct {
                    "Correct!".to_string()
                } else {
                    format!("Wrong! Correct answer: {}", outcome.correct_answer)
                };
                let score_line = next.quiz().map(|q| q.score_line()).unwrap_or_default();
                bot.send_message(chat_id, format!("{}\n{}", feedback, score_line))
                    .reply_markup(next_keyboard())
                    .await?;
                dialogue.update(next).await?;
            }
            Err(SessionError::AlreadyAnswered) => {
                bot.send_message(chat_id, "You already answered this one")
                    .reply_markup(next_keyboard())
                    .await?;
            }
            Err(SessionError::UnknownOption(_)) => {
                let mut reply = bot.send_message(chat_id, "Please choose one of the options");
                if let Some(question) = session.current_question() {
                    reply = reply.reply_markup(options_keyboard(question));
                }
                reply.await?;
            }
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

async fn receive_restart(
    bot: Bot,
    dialogue: QuizDialogue,
    session: Session,
    msg: Message,
) -> HandlerResult {
    match msg.text() {
        Some(RESTART) | Some(BACK_TO_TOPICS) => {
            dialogue.update(session.back_to_topics()).await?;
            send_topic_menu(&bot, msg.chat.id).await?;
        }
        _ => send_results(&bot, msg.chat.id, &session).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use interview_quiz::quiz::report::WeakArea;

    use super::*;

    #[test]
    fn results_list_each_subtopic_once() {
        let report = QuizReport {
            score: 3,
            total: 5,
            weak_areas: vec![WeakArea {
                subtopic: "loops".to_string(),
                misses: 2,
            }],
        };
        let text = results_text(&report);
        assert!(text.starts_with("You scored 3 out of 5!"));
        assert_eq!(text.matches("loops").count(), 1);
        assert!(!text.contains("Perfect score"));
    }

    #[test]
    fn perfect_run_has_no_review_list() {
        let report = QuizReport {
            score: 5,
            total: 5,
            weak_areas: vec![],
        };
        let text = results_text(&report);
        assert!(text.contains("Perfect score"));
        assert!(!text.contains("Topics to review"));
    }

    #[test]
    fn every_topic_has_a_button() {
        let keyboard = topic_keyboard();
        let labels: Vec<String> = keyboard
            .keyboard
            .iter()
            .flatten()
            .map(|b| b.text.clone())
            .collect();
        for topic in Topic::ALL {
            assert!(labels.contains(&topic.label()));
        }
    }

    #[test]
    fn every_difficulty_has_a_button() {
        let keyboard = difficulty_keyboard();
        let labels: Vec<&str> = keyboard
            .keyboard
            .iter()
            .flatten()
            .map(|b| b.text.as_str())
            .collect();
        for difficulty in Difficulty::ALL {
            assert!(labels.contains(&difficulty.label()));
            assert_eq!(Difficulty::from_label(difficulty.label()), Some(difficulty));
        }
    }
}
