//! External ABI surface of the `QuizGame` contract.
//!
//! Only what the client consumes is declared here; the contract source is
//! not part of this workspace.

alloy::sol! {
    #[sol(rpc)]
    contract QuizGame {
        event PlayerRegistered(address indexed player, string name);
        event NameChanged(address indexed player, string newName);
        event AnswerSubmitted(address indexed player, uint256 indexed questionId, uint8 answer);
        event AnswerEvaluated(address indexed player, uint256 indexed questionId, bool isCorrect);
        event ScoreUpdated(address indexed player, uint256 newScore);
        event AnswerRevealed(uint256 indexed questionId, uint8 correctAnswer, bytes32 salt);

        // Admin
        function owner() external view returns (address);
        function addQuestion(string memory _questionText, string[4] memory _options, bytes32 _answerHash) external;
        function revealAnswer(uint256 _questionId, uint8 _correctAnswer, bytes32 _salt) external;

        // Registration
        function register(string memory _name) external;
        function hasRegistered(address _player) external view returns (bool);
        function getPlayerName(address _player) external view returns (string memory);

        // Quiz
        function getQuestion(uint256 _questionId) external view returns (string memory questionText, string[4] memory options);
        function getQuestionState(uint256 _questionId) external view returns (bool isActive, bool isRevealed, address creator);
        function submitAnswer(uint256 _questionId, uint8 _answer) external;
        function hasPlayerAnswered(uint256 _questionId, address _player) external view returns (bool);
        function playerAnswers(uint256 _questionId, address _player) external view returns (uint8);
        function getCorrectAnswer(uint256 _questionId) external view returns (uint8);

        // Score
        function getPlayerScore(address _player) external view returns (uint256);
        function questionCount() external view returns (uint256);
    }
}
