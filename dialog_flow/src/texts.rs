//! User-facing reply texts shared by the handlers.

pub const MAIN_MENU_PROMPT: &str = "Вы в главном меню. Выберите раздел 👇";
pub const FALLBACK: &str = "Я не понял сообщение 🙈 Выберите действие на клавиатуре ниже";
pub const TECH_ERROR: &str = "Произошла техническая ошибка 😔 Попробуйте ещё раз чуть позже";

pub const CHOOSE_DATE: &str = "Выберите дату посещения 📅";
pub const CHOOSE_DATE_BUTTON: &str = "Пожалуйста, выберите дату кнопкой ниже 📅";
pub const CHOOSE_SESSION_BUTTON: &str = "Пожалуйста, выберите сеанс кнопкой ниже 🕒";
pub const CHOOSE_CATEGORY_BUTTON: &str = "Пожалуйста, выберите категорию кнопкой ниже 👇";
pub const PRESS_PAY_BUTTON: &str = "Для оплаты нажмите кнопку 💳";

pub const NO_SESSIONS: &str = "На эту дату сеансов не нашлось. Попробуйте выбрать другую дату 📅";
pub const SESSIONS_FETCH_FAILED: &str =
    "Не получилось загрузить расписание сеансов 😔 Попробуйте выбрать дату ещё раз";
pub const TARIFFS_FETCH_FAILED: &str =
    "Не получилось загрузить тарифы 😔 Попробуйте выбрать категорию ещё раз";
pub const NO_TARIFFS: &str =
    "В этой категории билетов на выбранную дату нет 😔 Попробуйте другую категорию";
pub const LOAD_FETCH_FAILED: &str = "Не получилось узнать загруженность 😔 Попробуйте чуть позже";

pub const INFO: &str = "ℹ️ Ледовый каток «Кристалл»\n\n\
Массовые катания каждый день, прокат коньков, инструкторы и кафе.\n\
Выберите раздел, чтобы узнать подробности 👇";

pub const OPENING_HOURS: &str = "🕒 Режим работы\n\n\
Пн–Пт: 10:00 – 22:00\n\
Сб–Вс: 09:00 – 23:00\n\n\
Касса закрывается за час до начала последнего сеанса";

pub const CONTACTS: &str = "📞 Контакты\n\n\
Телефон: +7 (900) 555-35-35\n\
Почта: info@crystal-rink.ru\n\
Группа: vk.com/crystal_rink";

pub const LOCATION: &str = "📍 Как добраться\n\n\
г. Казань, ул. Ледовая, 7\n\
Метро «Спортивная», выход 2, далее 5 минут пешком\n\
Парковка у главного входа бесплатная";
