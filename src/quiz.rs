use crate::error::{EngineError, Result};
use crate::models::{LessonProgress, Quiz, QuizOutcome};

/// Grade `answers` against the quiz's answer key, question by question.
pub fn grade(quiz: &Quiz, answers: &[i32]) -> Result<QuizOutcome> {
    if answers.len() != quiz.questions.len() {
        return Err(EngineError::validation(format!(
            "expected {} answers, got {}",
            quiz.questions.len(),
            answers.len()
        )));
    }

    let wrong: Vec<usize> = quiz
        .questions
        .iter()
        .zip(answers)
        .enumerate()
        .filter(|(_, (q, a))| q.correct_index != **a)
        .map(|(i, _)| i)
        .collect();

    let success = wrong.is_empty();
    let message = if success {
        "all answers are correct".to_string()
    } else {
        format!(
            "{} of {} answers are incorrect",
            wrong.len(),
            quiz.questions.len()
        )
    };

    Ok(QuizOutcome {
        success,
        message,
        wrong_question_indices: wrong,
    })
}

/// Last grading wins: the previous result is overwritten, pass or fail.
pub fn apply_quiz_result(progress: &mut LessonProgress, answers: &[i32], passed: bool) {
    progress.quiz_answers = Some(answers.to_vec());
    progress.quiz_passed = passed;
    progress.completed = progress.video_completed && progress.quiz_passed;
}
